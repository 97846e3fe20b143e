use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use super::fake::{Action, FakeDesktop, FakeWindow};
use super::{client_windows, fast_profile, init_tracing, login_window};
use crate::config::Profile;
use crate::controller::RunController;
use crate::day_probe::DayTrigger;
use crate::errors::ProcessError;
use crate::process::{LaunchCommand, ProcessInfo, ProcessTable};
use crate::types::{BackendMode, Credentials, Key, RunOutcome, RunState};

const TODAY: &str = "31.01.22";
const TOMORROW: &str = "01.02.22";

fn controller(fake: &Arc<FakeDesktop>, profile: Profile, expected: &str) -> RunController {
    RunController::new(
        Credentials::new("teller", "s3cret"),
        expected,
        profile,
        fake.clone(),
        fake.clone(),
    )
}

fn count(transitions: &[RunState], state: RunState) -> usize {
    transitions.iter().filter(|s| **s == state).count()
}

#[test]
fn healthy_client_walks_every_state() {
    init_tracing();
    let fake = Arc::new(FakeDesktop::new());
    fake.on_launch(|screen, pid| client_windows(screen, pid, TODAY));
    let mut controller = controller(&fake, fast_profile(), TODAY);

    let outcome = controller.run();

    assert_eq!(outcome, RunOutcome::Success { matched: true });
    assert_eq!(
        controller.transitions(),
        &[
            RunState::Starting,
            RunState::LoggingIn,
            RunState::Connecting,
            RunState::ConfirmingWarning,
            RunState::CheckingDay,
            RunState::Done,
        ]
    );
    assert_eq!(controller.state(), RunState::Done);
    assert!(fake.actions().iter().any(|a| matches!(
        a,
        Action::Keystroke { label, key: Key::Enter, .. } if label == "OK"
    )));
    // The client is closed once the day was read
    assert!(controller.owned_process().is_none());
    assert!(fake.running_named("COLVIR").is_empty());
}

#[test]
fn stale_login_dialog_kills_both_owners_and_restarts() {
    init_tracing();
    let fake = Arc::new(FakeDesktop::new());
    // The first launch also brings up a second instance with its own login dialog
    fake.on_launch_once(|screen, _pid| {
        let stale = screen.add_process("COLVIR.exe");
        screen.add_window(login_window(stale));
    });
    fake.on_launch(|screen, pid| client_windows(screen, pid, TODAY));
    let mut controller = controller(&fake, fast_profile(), TODAY);

    let outcome = controller.run();

    assert_eq!(outcome, RunOutcome::Success { matched: true });
    let transitions = controller.transitions();
    assert_eq!(
        &transitions[..3],
        &[RunState::Starting, RunState::LoggingIn, RunState::Retrying]
    );
    assert_eq!(count(transitions, RunState::Starting), 2);

    // Both owners of the duplicate dialogs were terminated before the restart,
    // and nothing was typed into either of them
    let kills = fake.kills();
    assert!(kills.len() >= 3, "{kills:?}");
    let mut first_two = kills[..2].to_vec();
    first_two.sort_unstable();
    assert_eq!(first_two, vec![1001, 1002]);
    let typed = fake
        .actions()
        .iter()
        .filter(|a| matches!(a, Action::SetText { .. }))
        .count();
    assert_eq!(typed, 2);
}

#[test]
fn trigger_polarity_is_configurable() {
    let fake = Arc::new(FakeDesktop::new());
    fake.on_launch(|screen, pid| client_windows(screen, pid, TODAY));

    let mut equal = controller(&fake, fast_profile(), TODAY);
    assert_eq!(equal.run(), RunOutcome::Success { matched: true });
    equal.set_expected_day(TOMORROW);
    assert_eq!(equal.run(), RunOutcome::Success { matched: false });

    let differ_profile = Profile {
        trigger: DayTrigger::Differ,
        ..fast_profile()
    };
    let mut differ = controller(&fake, differ_profile, TODAY);
    assert_eq!(differ.run(), RunOutcome::Success { matched: false });
    differ.set_expected_day(TOMORROW);
    assert_eq!(differ.run(), RunOutcome::Success { matched: true });
}

#[test]
fn missing_login_window_times_out_and_restarts() {
    init_tracing();
    let fake = Arc::new(FakeDesktop::new());
    let mut launches = 0;
    fake.on_launch(move |screen, pid| {
        launches += 1;
        // The first instance hangs before showing any window
        if launches > 1 {
            client_windows(screen, pid, TODAY);
        }
    });
    let mut controller = controller(&fake, fast_profile(), TODAY);

    let outcome = controller.run();

    assert_eq!(outcome, RunOutcome::Success { matched: true });
    assert_eq!(
        &controller.transitions()[..4],
        &[
            RunState::Starting,
            RunState::LoggingIn,
            RunState::Retrying,
            RunState::Starting,
        ]
    );
    // The hung instance was terminated before the second launch
    assert_eq!(fake.kills().first(), Some(&1001));
}

#[test]
fn repeated_runs_start_from_a_clean_desktop() {
    let fake = Arc::new(FakeDesktop::new());
    let leftover = fake.add_process("COLVIR.exe");
    fake.add_window(login_window(leftover));
    fake.on_launch(|screen, pid| client_windows(screen, pid, TODAY));
    let mut controller = controller(&fake, fast_profile(), TODAY);

    for _ in 0..2 {
        assert_eq!(controller.run(), RunOutcome::Success { matched: true });
        assert_eq!(count(controller.transitions(), RunState::Starting), 1);
        assert!(fake.running_named("COLVIR").is_empty());
    }
    assert!(!fake.is_running(leftover));
}

#[test]
fn connection_error_dialog_forces_restart() {
    let fake = Arc::new(FakeDesktop::new());
    fake.on_launch_once(|screen, pid| {
        screen.add_window(FakeWindow::new("Connection error", pid).control("Button", "OK"));
    });
    fake.on_launch(|screen, pid| client_windows(screen, pid, TODAY));
    let mut controller = controller(&fake, fast_profile(), TODAY);

    let outcome = controller.run();

    assert_eq!(outcome, RunOutcome::Success { matched: true });
    let transitions = controller.transitions();
    assert_eq!(
        &transitions[..4],
        &[
            RunState::Starting,
            RunState::LoggingIn,
            RunState::Connecting,
            RunState::Retrying,
        ]
    );
    assert_eq!(count(transitions, RunState::ConfirmingWarning), 1);
}

#[test]
fn connect_adopts_running_instance() {
    let fake = Arc::new(FakeDesktop::new());
    fake.on_launch(|screen, launcher| {
        screen.add_window(login_window(launcher));
        let client = screen.add_process("COLVIR.exe");
        screen.add_window(
            FakeWindow::new(super::MAIN_TITLE, client)
                .control("Static", "Operational day is not opened")
                .control("Button", "OK"),
        );
        screen.add_window(
            FakeWindow::new(super::STATUS_TITLE, client)
                .control("Static", "Branch 001")
                .control("Static", "teller")
                .alternate_control("Static", TODAY),
        );
    });
    let profile = Profile {
        launch: LaunchCommand::new(r"C:\CBS_R\start.exe"),
        ..fast_profile()
    };
    let mut controller = controller(&fake, profile, TODAY);

    assert_eq!(controller.run(), RunOutcome::Success { matched: true });
    // Launcher terminated on adoption, client terminated when the run completed
    assert_eq!(fake.kills(), vec![1001, 1002]);
    assert!(fake.running_named("start").is_empty());
}

/// Process table whose first listing after a spawn comes back empty, like a
/// client that registers with the OS a moment after its launcher returns.
struct LateListing {
    inner: Arc<FakeDesktop>,
    hide_next: AtomicBool,
    hidden_scans: AtomicU32,
}

impl LateListing {
    fn new(inner: Arc<FakeDesktop>) -> Self {
        Self {
            inner,
            hide_next: AtomicBool::new(false),
            hidden_scans: AtomicU32::new(0),
        }
    }
}

impl ProcessTable for LateListing {
    fn spawn(&self, command: &LaunchCommand) -> io::Result<u32> {
        let pid = self.inner.spawn(command)?;
        self.hide_next.store(true, Ordering::SeqCst);
        Ok(pid)
    }

    fn list(&self) -> Vec<ProcessInfo> {
        if self.hide_next.swap(false, Ordering::SeqCst) {
            self.hidden_scans.fetch_add(1, Ordering::SeqCst);
            return Vec::new();
        }
        self.inner.list()
    }

    fn kill(&self, pid: u32) -> Result<(), ProcessError> {
        self.inner.kill(pid)
    }
}

#[test]
fn late_process_is_found_by_the_rescan_without_restart() {
    let fake = Arc::new(FakeDesktop::new());
    fake.on_launch(|screen, pid| client_windows(screen, pid, TODAY));
    let table = Arc::new(LateListing::new(fake.clone()));
    let mut controller = RunController::new(
        Credentials::new("teller", "s3cret"),
        TODAY,
        fast_profile(),
        fake.clone(),
        table.clone(),
    );

    let outcome = controller.run();

    assert_eq!(outcome, RunOutcome::Success { matched: true });
    assert_eq!(table.hidden_scans.load(Ordering::SeqCst), 1);
    assert_eq!(
        controller.transitions(),
        &[
            RunState::Starting,
            RunState::LoggingIn,
            RunState::Connecting,
            RunState::ConfirmingWarning,
            RunState::CheckingDay,
            RunState::Done,
        ]
    );
    // Adopted the launched instance, so only the final release killed anything
    assert_eq!(fake.kills(), vec![1001]);
}

#[test]
fn process_not_found_after_rescan_is_retried() {
    let fake = Arc::new(FakeDesktop::new());
    // The launcher never hands over to a client process
    fake.on_launch(|screen, pid| {
        screen.add_window(login_window(pid));
    });
    let profile = Profile {
        launch: LaunchCommand::new(r"C:\CBS_R\start.exe"),
        retry: fast_profile().retry.with_max_attempts(2),
        ..fast_profile()
    };
    let mut controller = controller(&fake, profile, TODAY);

    match controller.run() {
        RunOutcome::Retry(reason) => assert!(reason.starts_with("process_not_found"), "{reason}"),
        other => panic!("Expected Retry, got {other:?}"),
    }
    assert_eq!(count(controller.transitions(), RunState::Connecting), 2);
}

#[test]
fn missing_executable_is_fatal() {
    let fake = Arc::new(FakeDesktop::new());
    fake.fail_spawns(io::ErrorKind::NotFound);
    let mut controller = controller(&fake, fast_profile(), TODAY);

    match controller.run() {
        RunOutcome::Fatal(reason) => assert!(reason.starts_with("executable_missing"), "{reason}"),
        other => panic!("Expected Fatal, got {other:?}"),
    }
    assert_eq!(controller.transitions(), &[RunState::Starting]);
}

#[test]
fn missing_executable_can_be_retried() {
    let fake = Arc::new(FakeDesktop::new());
    fake.fail_spawns(io::ErrorKind::NotFound);
    let mut profile = fast_profile();
    profile.retry.fatal_on_missing_executable = false;
    let mut controller = controller(&fake, profile, TODAY);

    assert!(matches!(controller.run(), RunOutcome::Retry(_)));
    assert_eq!(count(controller.transitions(), RunState::Starting), 3);
}

#[test]
fn attempt_ceiling_yields_retry_outcome() {
    let fake = Arc::new(FakeDesktop::new());
    let mut controller = controller(&fake, fast_profile(), TODAY);

    match controller.run() {
        RunOutcome::Retry(reason) => assert!(reason.starts_with("window_timeout"), "{reason}"),
        other => panic!("Expected Retry, got {other:?}"),
    }
    let transitions = controller.transitions();
    assert_eq!(count(transitions, RunState::Starting), 3);
    assert_eq!(count(transitions, RunState::Retrying), 2);
    assert_eq!(fake.kills().len(), 3);
}

#[test]
fn mode_stays_primary_after_failed_day_checks() {
    let fake = Arc::new(FakeDesktop::new());
    // Status bar without the date label: every day check fails inside the
    // alternate backend
    fake.on_launch(|screen, pid| {
        screen.add_window(login_window(pid));
        screen.add_window(FakeWindow::new(super::MAIN_TITLE, pid));
        screen.add_window(FakeWindow::new(super::STATUS_TITLE, pid).control("Static", "Branch 001"));
    });
    let mut controller = controller(&fake, fast_profile(), TODAY);

    match controller.run() {
        RunOutcome::Retry(reason) => assert!(reason.starts_with("element_not_found"), "{reason}"),
        other => panic!("Expected Retry, got {other:?}"),
    }
    assert_eq!(count(controller.transitions(), RunState::CheckingDay), 3);
    assert_eq!(controller.session().mode(), BackendMode::Primary);
}
