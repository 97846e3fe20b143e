use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

use crate::errors::RunError;
use crate::locator::WindowLocator;
use crate::session::UiSession;
use crate::types::{ControlRef, ControlSelector, Credentials, WindowQuery, WindowRef};

/// Where the login dialog and its controls are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginProfile {
    /// Exact title of the login dialog
    pub window_title: String,
    pub username_field: ControlSelector,
    pub password_field: ControlSelector,
    pub confirm: ControlSelector,
}

impl Default for LoginProfile {
    fn default() -> Self {
        // The dialog lists the password edit before the user edit
        Self {
            window_title: "Login".to_string(),
            username_field: ControlSelector::class("Edit", 1),
            password_field: ControlSelector::class("Edit", 0),
            confirm: ControlSelector::text("OK"),
        }
    }
}

/// Drives the application's login dialog.
#[derive(Debug, Clone)]
pub struct LoginSequencer<'a> {
    profile: &'a LoginProfile,
    locator: &'a WindowLocator,
    timeout: Duration,
}

impl<'a> LoginSequencer<'a> {
    pub fn new(profile: &'a LoginProfile, locator: &'a WindowLocator, timeout: Duration) -> Self {
        Self {
            profile,
            locator,
            timeout,
        }
    }

    /// Fill in the credentials and confirm.
    ///
    /// Fails with `WindowTimeout` when the dialog never shows up,
    /// `AmbiguousWindow` when a stale dialog from an earlier run is still open
    /// next to the fresh one, and `ElementNotFound` when a field is missing.
    /// Nothing is typed into any window unless it was uniquely identified.
    #[instrument(skip(self, session, credentials), fields(window = %self.profile.window_title))]
    pub fn login(&self, session: &UiSession, credentials: &Credentials) -> Result<WindowRef, RunError> {
        let query = WindowQuery::exact(self.profile.window_title.clone());
        let window = self.locator.find(session, &query, self.timeout)?;

        let controls = session.descendants(&window)?;
        let username = pick(&controls, &self.profile.username_field, &window)?;
        let password = pick(&controls, &self.profile.password_field, &window)?;
        let confirm = pick(&controls, &self.profile.confirm, &window)?;

        session.set_text(username, &credentials.username)?;
        session.set_text(password, &credentials.password)?;
        session.click(confirm)?;

        info!(pid = window.pid, user = %credentials.username, "submitted login dialog");
        Ok(window)
    }
}

pub(crate) fn pick<'c>(
    controls: &'c [ControlRef],
    selector: &ControlSelector,
    window: &WindowRef,
) -> Result<&'c ControlRef, RunError> {
    selector.select(controls).ok_or_else(|| {
        RunError::ElementNotFound(format!("{selector} in window {:?}", window.title))
    })
}
