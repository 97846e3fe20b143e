//! Process lifecycle for the target application
//!
//! [`ProcessTable`] is the OS seam (spawn, enumerate, signal). [`ProcessManager`]
//! layers the workflow semantics on top of it: name lookup, termination that
//! tolerates already-exited processes, and the best-effort cleanup sweep.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use sysinfo::{Pid, ProcessesToUpdate, Signal, System};
use tracing::{debug, info, instrument, warn};

use crate::errors::{ProcessError, RunError};

/// Command line used to start the target executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl LaunchCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

/// OS process operations the workflow depends on.
pub trait ProcessTable: Send + Sync {
    /// Start `command`, returning the new PID
    fn spawn(&self, command: &LaunchCommand) -> io::Result<u32>;

    /// Snapshot of running processes. Order is whatever the OS enumeration yields.
    fn list(&self) -> Vec<ProcessInfo>;

    /// Send a termination signal to `pid`
    fn kill(&self, pid: u32) -> Result<(), ProcessError>;

    fn is_alive(&self, pid: u32) -> bool {
        self.list().iter().any(|p| p.pid == pid)
    }
}

/// A process the controller launched or discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pid: u32,
    alive: bool,
}

impl ProcessHandle {
    pub fn new(pid: u32) -> Self {
        Self { pid, alive: true }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Liveness as last observed by this handle; see [`ProcessManager::is_alive`]
    /// for a fresh check.
    pub fn alive(&self) -> bool {
        self.alive
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub terminated: Vec<u32>,
    pub skipped: Vec<(u32, ProcessError)>,
}

#[derive(Clone)]
pub struct ProcessManager {
    table: Arc<dyn ProcessTable>,
}

impl std::fmt::Debug for ProcessManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessManager").finish_non_exhaustive()
    }
}

impl ProcessManager {
    pub fn new(table: Arc<dyn ProcessTable>) -> Self {
        Self { table }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn launch(&self, command: &LaunchCommand) -> Result<ProcessHandle, RunError> {
        let program = command.program.display().to_string();
        match self.table.spawn(command) {
            Ok(pid) => {
                info!(pid, program = %program, "launched target process");
                Ok(ProcessHandle::new(pid))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(RunError::ExecutableMissing(format!("{program}: {e}")))
            }
            Err(e) => Err(RunError::LaunchFailed(format!("{program}: {e}"))),
        }
    }

    /// First running process whose name contains `name`.
    ///
    /// Ties are resolved by enumeration order, which the OS does not specify:
    /// with several matching processes any one of them may be returned.
    pub fn find_by_name(&self, name: &str) -> Result<ProcessHandle, RunError> {
        self.table
            .list()
            .into_iter()
            .find(|p| p.name.contains(name))
            .map(|p| {
                debug!(pid = p.pid, process = %p.name, "found running instance");
                ProcessHandle::new(p.pid)
            })
            .ok_or_else(|| RunError::ProcessNotFound(format!("no process named like {name:?}")))
    }

    /// Terminate `handle`. A process that already exited is not an error.
    pub fn terminate(&self, handle: &mut ProcessHandle) -> Result<(), RunError> {
        let result = self.terminate_pid(handle.pid);
        if result.is_ok() {
            handle.alive = false;
        }
        result
    }

    pub(crate) fn terminate_pid(&self, pid: u32) -> Result<(), RunError> {
        match self.table.kill(pid) {
            Ok(()) => {
                info!(pid, "terminated process");
                Ok(())
            }
            Err(ProcessError::AlreadyExited(_)) => {
                debug!(pid, "process already exited");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_alive(&self, handle: &ProcessHandle) -> bool {
        self.table.is_alive(handle.pid)
    }

    /// Best-effort sweep terminating every process whose name contains
    /// `pattern`. Failures on one process are logged and skipped.
    #[instrument(level = "debug", skip(self))]
    pub fn kill_all_by_name(&self, pattern: &str) -> SweepReport {
        let mut report = SweepReport::default();
        for process in self.table.list() {
            if !process.name.contains(pattern) {
                continue;
            }
            match self.table.kill(process.pid) {
                Ok(()) | Err(ProcessError::AlreadyExited(_)) => {
                    report.terminated.push(process.pid);
                }
                Err(e) => {
                    warn!(pid = process.pid, process = %process.name, error = %e, "skipping process during cleanup sweep");
                    report.skipped.push((process.pid, e));
                }
            }
        }
        if !report.terminated.is_empty() {
            info!(count = report.terminated.len(), pattern, "cleaned up leftover processes");
        }
        report
    }
}

/// [`ProcessTable`] backed by the host OS.
#[derive(Debug, Default)]
pub struct SystemProcessTable;

impl SystemProcessTable {
    pub fn new() -> Self {
        Self
    }

    fn snapshot() -> System {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        system
    }
}

impl ProcessTable for SystemProcessTable {
    fn spawn(&self, command: &LaunchCommand) -> io::Result<u32> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .spawn()?;
        Ok(child.id())
    }

    fn list(&self) -> Vec<ProcessInfo> {
        Self::snapshot()
            .processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
            })
            .collect()
    }

    fn kill(&self, pid: u32) -> Result<(), ProcessError> {
        let mut system = Self::snapshot();
        let sys_pid = Pid::from_u32(pid);
        let Some(process) = system.process(sys_pid) else {
            return Err(ProcessError::AlreadyExited(pid));
        };

        // Windows has no SIGTERM; fall back to the platform kill there.
        let delivered = process.kill_with(Signal::Term).unwrap_or_else(|| process.kill());
        if delivered {
            return Ok(());
        }

        system.refresh_processes(ProcessesToUpdate::Some(&[sys_pid]), true);
        if system.process(sys_pid).is_none() {
            Err(ProcessError::AlreadyExited(pid))
        } else {
            Err(ProcessError::AccessDenied(pid))
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        let mut system = System::new();
        let sys_pid = Pid::from_u32(pid);
        system.refresh_processes(ProcessesToUpdate::Some(&[sys_pid]), true);
        system.process(sys_pid).is_some()
    }
}
