//! The run state machine
//!
//! One [`RunController::run`] performs launch → login → connect → confirm
//! warning → check day, restarting the whole sequence from the top whenever a
//! step fails with a retryable error. Before every restart the owned process
//! (and, for an ambiguous window, the owner of every matching window) is
//! terminated, so no attempt ever inherits windows from the previous one.

use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, instrument, warn};

use crate::backend::UiBackend;
use crate::config::Profile;
use crate::day_probe::DayProbe;
use crate::errors::RunError;
use crate::locator::WindowLocator;
use crate::login::LoginSequencer;
use crate::process::{ProcessHandle, ProcessManager, ProcessTable};
use crate::retry::ErrorClass;
use crate::session::UiSession;
use crate::types::{BackendMode, Credentials, RunOutcome, RunState};
use crate::warning::WarningDismisser;

pub struct RunController {
    credentials: Credentials,
    expected_day: String,
    profile: Profile,
    processes: ProcessManager,
    session: UiSession,
    locator: WindowLocator,
    owned: Option<ProcessHandle>,
    state: RunState,
    transitions: Vec<RunState>,
}

impl std::fmt::Debug for RunController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunController")
            .field("credentials", &self.credentials)
            .field("expected_day", &self.expected_day)
            .field("state", &self.state)
            .field("owned", &self.owned)
            .finish_non_exhaustive()
    }
}

impl RunController {
    pub fn new(
        credentials: Credentials,
        expected_day: impl Into<String>,
        profile: Profile,
        backend: Arc<dyn UiBackend>,
        processes: Arc<dyn ProcessTable>,
    ) -> Self {
        let locator = WindowLocator::new(profile.timings.poll_interval());
        Self {
            credentials,
            expected_day: expected_day.into(),
            profile,
            processes: ProcessManager::new(processes),
            session: UiSession::new(backend),
            locator,
            owned: None,
            state: RunState::Starting,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state entered during the last `run`, in order.
    pub fn transitions(&self) -> &[RunState] {
        &self.transitions
    }

    pub fn owned_process(&self) -> Option<&ProcessHandle> {
        self.owned.as_ref()
    }

    pub fn expected_day(&self) -> &str {
        &self.expected_day
    }

    pub fn set_expected_day(&mut self, expected_day: impl Into<String>) {
        self.expected_day = expected_day.into();
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> &UiSession {
        &self.session
    }

    /// Run the workflow until an attempt completes, fails fatally, or the
    /// retry policy runs out of attempts.
    #[instrument(skip(self), fields(expected = %self.expected_day))]
    pub fn run(&mut self) -> RunOutcome {
        self.transitions.clear();
        self.release_owned();

        let sweep = self.processes.kill_all_by_name(&self.profile.process_name);
        if !sweep.skipped.is_empty() {
            warn!(skipped = sweep.skipped.len(), "some leftover processes could not be terminated");
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let error = match self.attempt() {
                Ok(matched) => {
                    info!(attempt, matched, "run completed");
                    return RunOutcome::Success { matched };
                }
                Err(error) => error,
            };

            self.clean_up_after(&error);
            let reason = format!("{}: {error}", error.kind());

            if self.profile.retry.classify(&error) == ErrorClass::Fatal {
                error!(attempt, error = %error, "run failed with a non-retryable error");
                return RunOutcome::Fatal(reason);
            }
            if !self.profile.retry.allows_another(attempt) {
                warn!(attempt, error = %error, "giving up after exhausting attempts");
                return RunOutcome::Retry(reason);
            }

            self.transition(RunState::Retrying);
            let delay = self.profile.retry.backoff(attempt);
            warn!(attempt, kind = error.kind(), error = %error, ?delay, "attempt failed, restarting");
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }

    fn attempt(&mut self) -> Result<bool, RunError> {
        debug_assert_eq!(self.session.mode(), BackendMode::Primary);
        let timings = self.profile.timings.clone();

        self.transition(RunState::Starting);
        let launched = self.processes.launch(&self.profile.launch)?;
        self.owned = Some(launched);

        self.transition(RunState::LoggingIn);
        LoginSequencer::new(&self.profile.login, &self.locator, timings.window_timeout())
            .login(&self.session, &self.credentials)?;
        thread::sleep(timings.login_settle());

        self.transition(RunState::Connecting);
        let pid = self.connect()?;
        self.check_connection(pid)?;

        self.transition(RunState::ConfirmingWarning);
        WarningDismisser::new(
            &self.profile.main_window_title,
            &self.profile.warning_confirm_text,
        )
        .dismiss_if_present(&self.session, pid)?;
        thread::sleep(timings.warning_settle());

        self.transition(RunState::CheckingDay);
        let matched = DayProbe::new(
            &self.profile.status,
            &self.locator,
            timings.window_timeout(),
            self.profile.trigger,
        )
        .check_business_day(&mut self.session, &self.expected_day)?;

        self.release_owned();
        self.transition(RunState::Done);
        Ok(matched)
    }

    /// Find the running instance by name, rescanning once after a short
    /// delay, and take ownership of it.
    fn connect(&mut self) -> Result<u32, RunError> {
        let name = &self.profile.process_name;
        let found = match self.processes.find_by_name(name) {
            Ok(handle) => handle,
            Err(RunError::ProcessNotFound(_)) => {
                debug!(process = %name, "process not visible yet, rescanning");
                thread::sleep(self.profile.timings.rescan_delay());
                self.processes.find_by_name(name)?
            }
            Err(e) => return Err(e),
        };

        let pid = found.pid();
        if let Some(mut previous) = self.owned.replace(found) {
            if previous.pid() != pid {
                info!(launched = previous.pid(), connected = pid, "adopting running instance");
                self.processes.terminate(&mut previous)?;
            }
        }
        Ok(pid)
    }

    fn check_connection(&self, pid: u32) -> Result<(), RunError> {
        let Some(error_title) = &self.profile.connection_error_title else {
            return Ok(());
        };
        if self
            .session
            .windows_for_process(pid)?
            .iter()
            .any(|w| &w.title == error_title)
        {
            return Err(RunError::ConnectionRejected(error_title.clone()));
        }
        Ok(())
    }

    fn clean_up_after(&mut self, error: &RunError) {
        if let RunError::AmbiguousWindow { windows, .. } = error {
            let mut owners: Vec<u32> = windows.iter().map(|w| w.pid).collect();
            owners.sort_unstable();
            owners.dedup();
            for pid in owners {
                info!(pid, "terminating owner of ambiguous window");
                if let Err(e) = self.processes.terminate_pid(pid) {
                    warn!(pid, error = %e, "failed to terminate owner of ambiguous window");
                }
            }
        }
        self.release_owned();
    }

    fn release_owned(&mut self) {
        if let Some(mut handle) = self.owned.take() {
            if let Err(e) = self.processes.terminate(&mut handle) {
                warn!(pid = handle.pid(), error = %e, "failed to terminate owned process");
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
        self.transitions.push(next);
    }
}
