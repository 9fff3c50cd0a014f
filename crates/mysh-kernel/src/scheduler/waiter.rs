//! Blocking wait on one job's process group.

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use super::reactor::{apply_event, classify, UnknownPid};
use super::report::Reporter;
use super::{Job, JobId, JobTable};

/// Condition that ends a [`wait_for_job`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Every process is suspended or finished (foreground and `fg`).
    Stopped,
    /// Every process is finished (`kill`).
    Completed,
}

impl WaitUntil {
    fn reached(self, job: &Job) -> bool {
        match self {
            WaitUntil::Stopped => job.is_stopped(),
            WaitUntil::Completed => job.is_completed(),
        }
    }
}

/// How long one capture poll lasts before the group is checked again.
const CAPTURE_POLL_MS: u16 = 50;

/// Block until job `id` reaches `until`.
///
/// Waits on the job's group only, so status changes for other jobs stay
/// queued for the reactor. When the group has no children left, processes
/// still marked live are forced to Terminated: nothing can report on them
/// any more.
///
/// A job that still writes into capture pipes (a background job brought
/// back with `fg`) would block on a full pipe while we block in `waitpid`,
/// so for such a job the wait alternates between polling the pipes and a
/// non-blocking `waitpid`.
#[tracing::instrument(level = "debug", skip(table, reporter))]
pub(crate) fn wait_for_job(table: &mut JobTable, reporter: &mut Reporter, id: JobId, until: WaitUntil) {
    let flags = WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;

    loop {
        let Some(job) = table.get(id) else {
            return;
        };
        if until.reached(job) {
            return;
        }
        let Some(pgid) = job.pgid() else {
            return;
        };
        let draining = job.capture().is_some_and(|c| !c.is_finished());
        let wait_flags = if draining { flags | WaitPidFlag::WNOHANG } else { flags };

        match waitpid(Pid::from_raw(-pgid.as_raw()), Some(wait_flags)) {
            Ok(WaitStatus::StillAlive) => {
                if let Some(capture) = table.get_mut(id).and_then(Job::capture_mut) {
                    if let Err(e) = capture.pull_when_ready(CAPTURE_POLL_MS) {
                        tracing::warn!(job = %id, error = %e, "reading capture failed");
                        // Unreadable pipes: fall back to waiting on the group.
                        capture.abandon();
                    }
                }
            }
            Ok(status) => {
                let Some((pid, change)) = classify(status) else {
                    continue;
                };
                if let Err(UnknownPid(pid)) = apply_event(table, reporter, pid, change) {
                    reporter.error(&format!("no child process {pid}"));
                    return;
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                force_terminated(table, id);
                return;
            }
            Err(e) => {
                reporter.error(&format!("waitpid: {e}"));
                return;
            }
        }
    }
}

fn force_terminated(table: &mut JobTable, id: JobId) {
    let Some(job) = table.get_mut(id) else {
        return;
    };
    for process in job.processes_mut() {
        if !process.status().is_terminal() {
            tracing::debug!(job = %id, pid = ?process.pid(), "no child left to wait for");
            process.force_terminated();
        }
    }
}
