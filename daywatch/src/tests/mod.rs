
mod controller_tests;

use std::time::Duration;

use crate::config::{Profile, Timings};
use crate::retry::RetryPolicy;
use fake::{FakeScreen, FakeWindow};

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_test_writer()
        .try_init();
}

pub const MAIN_TITLE: &str = "Colvir Banking System";
pub const STATUS_TITLE: &str = "Information panel - branch 001";

/// Default profile with every wait shortened for the fake desktop.
pub fn fast_profile() -> Profile {
    Profile {
        timings: Timings {
            window_timeout_ms: 30,
            poll_interval_ms: 1,
            login_settle_ms: 0,
            warning_settle_ms: 0,
            rescan_delay_ms: 1,
        },
        retry: RetryPolicy::default().with_max_attempts(3),
        ..Profile::default()
    }
}

pub fn login_window(pid: u32) -> FakeWindow {
    FakeWindow::new("Login", pid)
        .control("Static", "Password")
        .control("Edit", "")
        .control("Static", "User")
        .control("Edit", "")
        .control("Button", "OK")
}

/// Everything a healthy client shows after start-up, with `day` in the status bar.
pub fn client_windows(screen: &mut FakeScreen, pid: u32, day: &str) {
    screen.add_window(login_window(pid));
    screen.add_window(
        FakeWindow::new(MAIN_TITLE, pid)
            .control("Static", "Operational day is not opened")
            .control("Button", "OK"),
    );
    screen.add_window(
        FakeWindow::new(STATUS_TITLE, pid)
            .control("Static", "Branch 001")
            .control("Static", "teller")
            .alternate_control("Static", day),
    );
}

pub fn wait(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
