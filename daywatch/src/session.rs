//! Scoped control of the active backend mode
//!
//! The mode lives on [`UiSession`] and every UI call goes through the session,
//! which forwards its current mode to the backend. The only way to change the
//! mode is [`BackendSession`], which restores the previous mode when dropped,
//! so a failure or panic inside the scope can never leak `Alternate` into the
//! rest of the workflow.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::debug;

use crate::backend::UiBackend;
use crate::errors::RunError;
use crate::types::{BackendMode, ControlRef, Key, TitleMatcher, WindowRef};

pub struct UiSession {
    backend: Arc<dyn UiBackend>,
    mode: BackendMode,
}

impl UiSession {
    pub fn new(backend: Arc<dyn UiBackend>) -> Self {
        Self {
            backend,
            mode: BackendMode::Primary,
        }
    }

    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    /// Run `block` with the mode switched to `mode`, restoring the previous
    /// mode on every exit path.
    pub fn with_backend<T>(&mut self, mode: BackendMode, block: impl FnOnce(&mut UiSession) -> T) -> T {
        let mut scope = BackendSession::enter(self, mode);
        block(&mut scope)
    }

    pub fn top_level_windows(&self) -> Result<Vec<WindowRef>, RunError> {
        self.backend.top_level_windows(self.mode)
    }

    pub fn find_windows(&self, matcher: &TitleMatcher) -> Result<Vec<WindowRef>, RunError> {
        self.backend.find_windows(self.mode, matcher)
    }

    pub fn windows_for_process(&self, pid: u32) -> Result<Vec<WindowRef>, RunError> {
        self.backend.windows_for_process(self.mode, pid)
    }

    pub fn descendants(&self, window: &WindowRef) -> Result<Vec<ControlRef>, RunError> {
        self.backend.descendants(self.mode, window)
    }

    pub fn text(&self, control: &ControlRef) -> Result<String, RunError> {
        self.backend.text(self.mode, control)
    }

    pub fn set_text(&self, control: &ControlRef, text: &str) -> Result<(), RunError> {
        self.backend.set_text(self.mode, control, text)
    }

    pub fn click(&self, control: &ControlRef) -> Result<(), RunError> {
        self.backend.click(self.mode, control)
    }

    pub fn send_keystroke(&self, control: &ControlRef, key: Key) -> Result<(), RunError> {
        self.backend.send_keystroke(self.mode, control, key)
    }
}

impl fmt::Debug for UiSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiSession").field("mode", &self.mode).finish()
    }
}

/// RAII guard holding the session in a switched mode.
pub struct BackendSession<'a> {
    session: &'a mut UiSession,
    previous: BackendMode,
}

impl<'a> BackendSession<'a> {
    pub fn enter(session: &'a mut UiSession, mode: BackendMode) -> Self {
        let previous = session.mode;
        debug!(?previous, ?mode, "switching backend mode");
        session.mode = mode;
        Self { session, previous }
    }
}

impl Deref for BackendSession<'_> {
    type Target = UiSession;

    fn deref(&self) -> &UiSession {
        self.session
    }
}

impl DerefMut for BackendSession<'_> {
    fn deref_mut(&mut self) -> &mut UiSession {
        self.session
    }
}

impl Drop for BackendSession<'_> {
    fn drop(&mut self) {
        debug!(restored = ?self.previous, "restoring backend mode");
        self.session.mode = self.previous;
    }
}
