//! Job identification, execution modes and the process status machine.

use serde::{Deserialize, Serialize};

/// Identifier of a registered job, as shown in `[N]` and addressed by `%N`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a job (or one stage of it) is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    /// The shell returns to the prompt immediately; output is captured.
    Background,
    /// The shell hands over the terminal and blocks until the job stops.
    #[default]
    Foreground,
    /// A stage that feeds the next stage of its pipeline.
    Pipeline,
}

impl std::fmt::Display for ExecMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecMode::Background => write!(f, "background"),
            ExecMode::Foreground => write!(f, "foreground"),
            ExecMode::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// Signal that ended a process, as far as job control cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermSignal {
    /// SIGINT, usually Ctrl-C at the terminal.
    Interrupt,
    /// SIGQUIT, usually Ctrl-\ at the terminal.
    Quit,
    /// SIGKILL, sent by `kill %N`.
    Kill,
    /// Any other fatal signal, by number.
    Other(i32),
}

/// A state change reported by the operating system for one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The child was stopped (SIGTSTP, SIGSTOP, SIGTTIN, SIGTTOU).
    Stopped,
    /// The child was resumed by SIGCONT.
    Continued,
    /// The child exited on its own with the given code.
    Exited(i32),
    /// The child was killed by a signal.
    Signaled(TermSignal),
}

/// Lifecycle status of one process (pipeline stage).
///
/// ```text
/// New ──append──▶ Ready ──launch──▶ Running ◀──┐
///                   │                 │  │      │ continue
///                   │ launch failure  │  └─stop─▶ Suspended ──▶ Continued
///                   ▼                 ▼
///               Terminated      Done / Terminated / Quit
/// ```
///
/// Done, Terminated and Quit are terminal: no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    #[default]
    New,
    Ready,
    Running,
    Suspended,
    Continued,
    Done,
    Terminated,
    Quit,
}

impl ProcessStatus {
    /// True for Done, Terminated and Quit.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessStatus::Done | ProcessStatus::Terminated | ProcessStatus::Quit
        )
    }

    /// True while the process is executing (Running or Continued).
    pub fn is_active(self) -> bool {
        matches!(self, ProcessStatus::Running | ProcessStatus::Continued)
    }

    pub fn is_suspended(self) -> bool {
        self == ProcessStatus::Suspended
    }

    /// Added to a job.
    pub fn on_append(self) -> Self {
        match self {
            ProcessStatus::New => ProcessStatus::Ready,
            other => other,
        }
    }

    /// About to be forked.
    pub fn on_launch(self) -> Self {
        match self {
            ProcessStatus::New | ProcessStatus::Ready => ProcessStatus::Running,
            other => other,
        }
    }

    /// Could not be started (bad redirection); it never runs.
    pub fn on_launch_failure(self) -> Self {
        match self {
            ProcessStatus::New | ProcessStatus::Ready => ProcessStatus::Terminated,
            other => other,
        }
    }

    pub fn on_stop(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            ProcessStatus::Suspended
        }
    }

    pub fn on_continue(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            ProcessStatus::Continued
        }
    }

    pub fn on_exit(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            ProcessStatus::Done
        }
    }

    pub fn on_signal(self, signal: TermSignal) -> Self {
        if self.is_terminal() {
            return self;
        }
        match signal {
            TermSignal::Quit => ProcessStatus::Quit,
            TermSignal::Interrupt | TermSignal::Kill | TermSignal::Other(_) => {
                ProcessStatus::Terminated
            }
        }
    }

    /// Apply an OS-reported change.
    pub fn apply(self, change: StatusChange) -> Self {
        match change {
            StatusChange::Stopped => self.on_stop(),
            StatusChange::Continued => self.on_continue(),
            StatusChange::Exited(_) => self.on_exit(),
            StatusChange::Signaled(signal) => self.on_signal(signal),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessStatus::New => "new",
            ProcessStatus::Ready => "ready",
            ProcessStatus::Running => "running",
            ProcessStatus::Suspended => "suspended",
            ProcessStatus::Continued => "continued",
            ProcessStatus::Done => "done",
            ProcessStatus::Terminated => "terminated",
            ProcessStatus::Quit => "quit",
        }
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one process for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// OS process id, absent if the stage was never forked.
    pub pid: Option<i32>,
    /// Current status.
    pub status: ProcessStatus,
    /// Argument vector.
    pub argv: Vec<String>,
}

/// Snapshot of one job for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    /// Job ID.
    pub id: JobId,
    /// Process group id, absent until the first stage is forked.
    pub pgid: Option<i32>,
    /// Execution mode chosen at submission.
    pub mode: ExecMode,
    /// Stages in pipeline order.
    pub processes: Vec<ProcessInfo>,
}

impl JobInfo {
    /// Pipeline text, stages joined by ` | `.
    pub fn command(&self) -> String {
        self.processes
            .iter()
            .map(|p| p.argv.join(" "))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
