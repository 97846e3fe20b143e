use tracing::{debug, info};

use crate::errors::RunError;
use crate::session::UiSession;
use crate::types::Key;

/// Confirms the startup warning the application shows inside its main window.
#[derive(Debug, Clone)]
pub struct WarningDismisser<'a> {
    main_window_title: &'a str,
    confirm_text: &'a str,
}

impl<'a> WarningDismisser<'a> {
    pub fn new(main_window_title: &'a str, confirm_text: &'a str) -> Self {
        Self {
            main_window_title,
            confirm_text,
        }
    }

    /// Send the confirm keystroke to the warning's "OK" control if it is up.
    ///
    /// Only windows owned by `pid` titled exactly like the main window are
    /// inspected, and only the first matching control per window is confirmed.
    /// Returns whether anything was confirmed. A missing warning is not an
    /// error; there is no internal waiting.
    pub fn dismiss_if_present(&self, session: &UiSession, pid: u32) -> Result<bool, RunError> {
        let mut confirmed = false;
        for window in session.windows_for_process(pid)? {
            if window.title != self.main_window_title {
                continue;
            }
            let controls = session.descendants(&window)?;
            if let Some(ok) = controls.iter().find(|c| c.text == self.confirm_text) {
                session.send_keystroke(ok, Key::Enter)?;
                info!(pid, window = %window.title, "confirmed startup warning");
                confirmed = true;
            }
        }
        if !confirmed {
            debug!(pid, "no startup warning to confirm");
        }
        Ok(confirmed)
    }
}
