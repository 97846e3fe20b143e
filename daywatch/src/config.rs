//! Workflow profile: what to launch, which windows and controls to look for,
//! and how long to wait for them.
//!
//! Every field has a default matching the Colvir client; a JSON profile only
//! needs to list what differs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::day_probe::{DayTrigger, StatusProfile};
use crate::login::LoginProfile;
use crate::process::LaunchCommand;
use crate::retry::RetryPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid profile: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Budget for every window resolution
    pub window_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Pause after submitting the login dialog
    pub login_settle_ms: u64,
    /// Pause after confirming the startup warning
    pub warning_settle_ms: u64,
    /// Pause before the single rescan when the process is not found
    pub rescan_delay_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            window_timeout_ms: 20_000,
            poll_interval_ms: 250,
            login_settle_ms: 4_000,
            warning_settle_ms: 1_000,
            rescan_delay_ms: 1_000,
        }
    }
}

impl Timings {
    pub fn window_timeout(&self) -> Duration {
        Duration::from_millis(self.window_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    pub fn warning_settle(&self) -> Duration {
        Duration::from_millis(self.warning_settle_ms)
    }

    pub fn rescan_delay(&self) -> Duration {
        Duration::from_millis(self.rescan_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub launch: LaunchCommand,
    /// Substring of the target's process name
    pub process_name: String,
    pub login: LoginProfile,
    pub main_window_title: String,
    /// Text of the control confirming the startup warning
    pub warning_confirm_text: String,
    /// Title of the dialog shown when the application cannot reach its server
    pub connection_error_title: Option<String>,
    pub status: StatusProfile,
    pub trigger: DayTrigger,
    pub timings: Timings,
    pub retry: RetryPolicy,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            launch: LaunchCommand::new(r"C:\CBS_R\COLVIR.exe"),
            process_name: "COLVIR".to_string(),
            login: LoginProfile::default(),
            main_window_title: "Colvir Banking System".to_string(),
            warning_confirm_text: "OK".to_string(),
            connection_error_title: Some("Connection error".to_string()),
            status: StatusProfile::default(),
            trigger: DayTrigger::default(),
            timings: Timings::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Profile {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
