use std::sync::Arc;

use crate::backend::UiBackend;
use crate::errors::RunError;

#[cfg(target_os = "windows")]
pub mod windows;

/// Create the GUI backend for the current platform
pub fn create_backend() -> Result<Arc<dyn UiBackend>, RunError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::WindowsBackend::new()?))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Err(RunError::UnsupportedPlatform(
            "the target application only runs on Windows".to_string(),
        ))
    }
}
