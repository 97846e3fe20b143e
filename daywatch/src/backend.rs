use crate::errors::RunError;
use crate::types::{BackendMode, ControlRef, Key, TitleMatcher, WindowRef};

/// The capability every platform-specific GUI backend must implement.
///
/// Every call receives the mode explicitly; the backend holds no notion of a
/// "current" mode. Calls are blocking.
pub trait UiBackend: Send + Sync {
    /// All top-level windows currently on the desktop
    fn top_level_windows(&self, mode: BackendMode) -> Result<Vec<WindowRef>, RunError>;

    /// Top-level windows whose title satisfies `matcher`.
    /// Backends with a native title search may override this.
    fn find_windows(
        &self,
        mode: BackendMode,
        matcher: &TitleMatcher,
    ) -> Result<Vec<WindowRef>, RunError> {
        Ok(self
            .top_level_windows(mode)?
            .into_iter()
            .filter(|w| matcher.is_match(&w.title))
            .collect())
    }

    /// Top-level windows owned by `pid`
    fn windows_for_process(
        &self,
        mode: BackendMode,
        pid: u32,
    ) -> Result<Vec<WindowRef>, RunError> {
        Ok(self
            .top_level_windows(mode)?
            .into_iter()
            .filter(|w| w.pid == pid)
            .collect())
    }

    /// All descendant controls of `window`, in traversal order
    fn descendants(
        &self,
        mode: BackendMode,
        window: &WindowRef,
    ) -> Result<Vec<ControlRef>, RunError>;

    fn text(&self, mode: BackendMode, control: &ControlRef) -> Result<String, RunError>;

    fn set_text(
        &self,
        mode: BackendMode,
        control: &ControlRef,
        text: &str,
    ) -> Result<(), RunError>;

    fn click(&self, mode: BackendMode, control: &ControlRef) -> Result<(), RunError>;

    fn send_keystroke(
        &self,
        mode: BackendMode,
        control: &ControlRef,
        key: Key,
    ) -> Result<(), RunError>;
}
