use chrono::Local;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

use crate::errors::RunError;
use crate::locator::WindowLocator;
use crate::login::pick;
use crate::session::UiSession;
use crate::types::{BackendMode, ControlSelector, WindowQuery};

/// Which comparison between the read and the expected date counts as
/// "target reached".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayTrigger {
    /// Fire once the application shows the expected date
    #[default]
    Equal,
    /// Fire as soon as the application shows anything but the expected date
    Differ,
}

impl DayTrigger {
    pub fn fires(&self, expected: &str, actual: &str) -> bool {
        match self {
            DayTrigger::Equal => expected == actual,
            DayTrigger::Differ => expected != actual,
        }
    }
}

/// Where the business-date indicator lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusProfile {
    pub window: WindowQuery,
    pub date_label: ControlSelector,
}

impl Default for StatusProfile {
    fn default() -> Self {
        Self {
            window: WindowQuery::regex("Information panel.+"),
            date_label: ControlSelector::class("Static", 2),
        }
    }
}

/// Reads the business date shown by the application and compares it to the
/// expected value.
#[derive(Debug, Clone)]
pub struct DayProbe<'a> {
    profile: &'a StatusProfile,
    locator: &'a WindowLocator,
    timeout: Duration,
    trigger: DayTrigger,
}

impl<'a> DayProbe<'a> {
    pub fn new(
        profile: &'a StatusProfile,
        locator: &'a WindowLocator,
        timeout: Duration,
        trigger: DayTrigger,
    ) -> Self {
        Self {
            profile,
            locator,
            timeout,
            trigger,
        }
    }

    /// Read the date under the alternate backend and report whether the
    /// trigger fired. The session is back in its previous mode when this
    /// returns, whatever the result.
    #[instrument(skip(self, session))]
    pub fn check_business_day(&self, session: &mut UiSession, expected: &str) -> Result<bool, RunError> {
        let day = session.with_backend(BackendMode::Alternate, |s| self.read_day(s))?;
        let fired = self.trigger.fires(expected, &day);
        info!(
            now = %Local::now().format("%d-%m-%Y %H:%M:%S"),
            expected,
            day = %day,
            trigger = ?self.trigger,
            fired,
            "checked business day"
        );
        Ok(fired)
    }

    fn read_day(&self, session: &UiSession) -> Result<String, RunError> {
        let window = self.locator.find(session, &self.profile.window, self.timeout)?;
        let controls = session.descendants(&window)?;
        let label = pick(&controls, &self.profile.date_label, &window)?;
        Ok(session.text(label)?.trim().to_string())
    }
}
