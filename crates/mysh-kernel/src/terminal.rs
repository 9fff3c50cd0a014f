//! Terminal arbiter: who owns the controlling terminal.
//!
//! The shell owns the terminal while it prompts. Before blocking on a
//! foreground job it hands the terminal to the job's process group, so
//! Ctrl-C and Ctrl-Z reach the job instead of the shell, and takes it back
//! (restoring its saved modes) once the job stops or finishes.

use std::io::IsTerminal;
use std::os::fd::BorrowedFd;

use nix::libc;
use nix::sys::signal::{killpg, signal, SigHandler, Signal};
use nix::sys::termios::{tcgetattr, tcsetattr, SetArg, Termios};
use nix::unistd::{getpgrp, getpid, setpgid, tcgetpgrp, tcsetpgrp, Pid};

use crate::error::{JobError, JobResult};

/// Signals the shell ignores for itself and children reset to default.
const JOB_CONTROL_SIGNALS: [Signal; 5] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

/// The shell's stdin, which is the controlling terminal when job control is on.
pub(crate) fn tty_fd() -> BorrowedFd<'static> {
    // SAFETY: fd 0 stays open for the life of the process.
    unsafe { BorrowedFd::borrow_raw(libc::STDIN_FILENO) }
}

/// Ownership of the controlling terminal, held by an interactive shell.
#[derive(Debug, Clone)]
pub struct Terminal {
    shell_pgid: Pid,
    modes: Option<Termios>,
}

impl Terminal {
    /// Set the shell up for job control.
    ///
    /// Returns `Ok(None)` when stdin is not a terminal. Otherwise waits until
    /// the shell is in the foreground, ignores the interactive job-control
    /// signals, puts the shell in its own process group, claims the terminal
    /// and saves its modes. Failing to get an own process group is fatal.
    pub fn init() -> JobResult<Option<Self>> {
        if !std::io::stdin().is_terminal() {
            return Ok(None);
        }
        let tty = tty_fd();

        loop {
            let group = getpgrp();
            let owner = tcgetpgrp(tty).map_err(JobError::Terminal)?;
            if owner == group {
                break;
            }
            tracing::debug!(shell = group.as_raw(), owner = owner.as_raw(), "not in foreground, stopping");
            killpg(group, Signal::SIGTTIN).map_err(JobError::Terminal)?;
        }

        ignore_job_control_signals();

        let pid = getpid();
        if getpgrp() != pid {
            setpgid(pid, pid).map_err(JobError::ShellGroup)?;
        }
        tcsetpgrp(tty, pid).map_err(JobError::Terminal)?;
        let modes = tcgetattr(tty).ok();

        tracing::debug!(pgid = pid.as_raw(), "job control enabled");
        Ok(Some(Self {
            shell_pgid: pid,
            modes,
        }))
    }

    /// Make `pgid` the terminal's foreground group.
    pub fn give_terminal_to(&self, pgid: Pid) -> JobResult<()> {
        tcsetpgrp(tty_fd(), pgid).map_err(JobError::Terminal)
    }

    /// Take the terminal back and restore the shell's modes.
    pub fn reclaim_terminal(&self) -> JobResult<()> {
        let tty = tty_fd();
        tcsetpgrp(tty, self.shell_pgid).map_err(JobError::Terminal)?;
        if let Some(modes) = &self.modes {
            tcsetattr(tty, SetArg::TCSADRAIN, modes).map_err(JobError::Terminal)?;
        }
        Ok(())
    }
}

/// The shell must not be stopped or interrupted by the keys meant for jobs.
pub fn ignore_job_control_signals() {
    for sig in JOB_CONTROL_SIGNALS {
        // SAFETY: SIG_IGN installs no handler code.
        let _ = unsafe { signal(sig, SigHandler::SigIgn) };
    }
}

/// Undo the shell's dispositions in a freshly forked child.
///
/// Runs between fork and exec, so it only makes async-signal-safe calls.
pub(crate) fn restore_default_signals() {
    for sig in JOB_CONTROL_SIGNALS.into_iter().chain([Signal::SIGPIPE]) {
        // SAFETY: SIG_DFL installs no handler code.
        let _ = unsafe { signal(sig, SigHandler::SigDfl) };
    }
}
