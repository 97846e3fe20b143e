use std::time::Duration;
use thiserror::Error;

use crate::types::{WaitFor, WindowRef};

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Failed to launch process: {0}")]
    LaunchFailed(String),

    #[error("Executable not found: {0}")]
    ExecutableMissing(String),

    #[error("Timed out after {timeout:?} waiting for window {title:?} to reach {wait_for:?}")]
    WindowTimeout {
        title: String,
        wait_for: WaitFor,
        timeout: Duration,
    },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Window {title:?} is ambiguous: {} matches", windows.len())]
    AmbiguousWindow {
        title: String,
        windows: Vec<WindowRef>,
    },

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Application rejected the connection: {0}")]
    ConnectionRejected(String),

    #[error("Invalid title pattern: {0}")]
    InvalidPattern(String),

    #[error("UI backend error: {0}")]
    Backend(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl RunError {
    /// Short machine-friendly name used in logs and outcome reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::LaunchFailed(_) => "launch_failed",
            RunError::ExecutableMissing(_) => "executable_missing",
            RunError::WindowTimeout { .. } => "window_timeout",
            RunError::ElementNotFound(_) => "element_not_found",
            RunError::AmbiguousWindow { .. } => "ambiguous_window",
            RunError::ProcessNotFound(_) => "process_not_found",
            RunError::ConnectionRejected(_) => "connection_rejected",
            RunError::InvalidPattern(_) => "invalid_pattern",
            RunError::Backend(_) => "backend",
            RunError::UnsupportedPlatform(_) => "unsupported_platform",
            RunError::Process(_) => "process",
        }
    }
}

/// Failure reported by a [`crate::process::ProcessTable`] for a single process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Access denied for PID {0}")]
    AccessDenied(u32),

    #[error("Process {0} has already exited")]
    AlreadyExited(u32),

    #[error("Failed to signal PID {pid}: {message}")]
    Signal { pid: u32, message: String },
}
