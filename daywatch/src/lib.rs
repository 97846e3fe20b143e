//! Unattended supervision of a desktop application's login and business-date check
//!
//! [`RunController`] launches the target, logs in, confirms the startup warning
//! and reads the business date, restarting the whole sequence on GUI failures.
//! [`Watcher`] re-runs it on an interval and notifies once the date rolls over.

pub mod backend;
pub mod config;
pub mod controller;
pub mod day_probe;
pub mod errors;
pub mod locator;
pub mod login;
pub mod notify;
pub mod platforms;
pub mod process;
pub mod retry;
pub mod session;
#[cfg(test)]
mod tests;
pub mod types;
pub mod warning;
pub mod watch;

pub use backend::UiBackend;
pub use config::{ConfigError, Profile, Timings};
pub use controller::RunController;
pub use day_probe::{DayProbe, DayTrigger};
pub use errors::{ProcessError, RunError};
pub use locator::WindowLocator;
pub use notify::{NotificationSink, NotifyError, TelegramNotifier};
pub use process::{LaunchCommand, ProcessHandle, ProcessManager, ProcessTable, SystemProcessTable};
pub use retry::RetryPolicy;
pub use session::{BackendSession, UiSession};
pub use types::{BackendMode, Credentials, RunOutcome, RunState, WindowQuery};
pub use watch::{WatchError, WatchSettings, Watcher};
