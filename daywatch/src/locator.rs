use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::errors::RunError;
use crate::session::UiSession;
use crate::types::{WaitFor, WindowQuery, WindowRef};

// Default polling interval if none is specified on the locator itself
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Resolves top-level windows by title, waiting for them to appear or vanish.
///
/// Resolution never picks one of several matching windows: more than one match
/// is reported as [`RunError::AmbiguousWindow`] with every match attached so the
/// caller can decide what to do with the owning processes. The locator itself
/// has no side effects.
#[derive(Debug, Clone)]
pub struct WindowLocator {
    poll_interval: Duration,
}

impl Default for WindowLocator {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl WindowLocator {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Wait up to `timeout` for `query` to reach `wait_for`.
    ///
    /// Returns the unique matching window for [`WaitFor::Exists`] and `None`
    /// for [`WaitFor::Vanished`].
    #[instrument(level = "debug", skip(self, session), fields(query = %query))]
    pub fn resolve(
        &self,
        session: &UiSession,
        query: &WindowQuery,
        wait_for: WaitFor,
        timeout: Duration,
    ) -> Result<Option<WindowRef>, RunError> {
        let matcher = query.compile()?;
        let deadline = Instant::now() + timeout;

        loop {
            let mut matches = session.find_windows(&matcher)?;
            match wait_for {
                WaitFor::Exists if matches.len() > 1 => {
                    debug!(count = matches.len(), "ambiguous window query");
                    return Err(RunError::AmbiguousWindow {
                        title: query.title.clone(),
                        windows: matches,
                    });
                }
                WaitFor::Exists if matches.len() == 1 => return Ok(matches.pop()),
                WaitFor::Vanished if matches.is_empty() => return Ok(None),
                _ => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(RunError::WindowTimeout {
                    title: query.title.clone(),
                    wait_for,
                    timeout,
                });
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }

    /// Resolve the unique window matching `query`, waiting for it to exist.
    pub fn find(
        &self,
        session: &UiSession,
        query: &WindowQuery,
        timeout: Duration,
    ) -> Result<WindowRef, RunError> {
        self.resolve(session, query, WaitFor::Exists, timeout)?
            .ok_or_else(|| RunError::ElementNotFound(format!("window {query}")))
    }

    pub fn wait_vanished(
        &self,
        session: &UiSession,
        query: &WindowQuery,
        timeout: Duration,
    ) -> Result<(), RunError> {
        self.resolve(session, query, WaitFor::Vanished, timeout)
            .map(|_| ())
    }
}
