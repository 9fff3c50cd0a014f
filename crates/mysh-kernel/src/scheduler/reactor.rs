//! Signal reactor: turns child-state notifications into status transitions.
//!
//! The signal path only records that SIGCHLD arrived (tokio's signal driver
//! does that from its handler). Everything else, `waitpid` included, runs on
//! the main loop that owns the [`JobTable`]:
//!
//! ```text
//!   SIGCHLD ──▶ tokio signal driver ──▶ ChildEvents::recv() ─┐
//!                                                            ▼
//!   main loop: drain() ── waitpid(-1, WNOHANG) ──▶ classify ──▶ apply_event
//!                                                            │
//!                         no foreground job active? ──▶ reap_completed(Reactor)
//! ```

use std::io;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tokio::signal::unix::{signal, Signal as SignalStream, SignalKind};

use super::report::{reap_completed, ReapSource, Reporter};
use super::{JobTable, StatusChange, TermSignal};

/// Stream of "some child changed state" notifications.
///
/// Create it before launching anything: a SIGCHLD delivered before the
/// stream exists is not queued.
#[derive(Debug)]
pub struct ChildEvents {
    stream: SignalStream,
}

impl ChildEvents {
    /// Register for SIGCHLD. Must be called inside a tokio runtime.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            stream: signal(SignalKind::child())?,
        })
    }

    /// Wait for the next notification. Several signals may coalesce into one.
    pub async fn recv(&mut self) -> Option<()> {
        self.stream.recv().await
    }
}

/// Map a raw wait status to the pid it concerns and the change it reports.
pub fn classify(status: WaitStatus) -> Option<(Pid, StatusChange)> {
    match status {
        WaitStatus::Exited(pid, code) => Some((pid, StatusChange::Exited(code))),
        WaitStatus::Signaled(pid, signal, _) => {
            Some((pid, StatusChange::Signaled(term_signal(signal))))
        }
        WaitStatus::Stopped(pid, _) => Some((pid, StatusChange::Stopped)),
        WaitStatus::Continued(pid) => Some((pid, StatusChange::Continued)),
        _ => None,
    }
}

fn term_signal(signal: Signal) -> TermSignal {
    match signal {
        Signal::SIGINT => TermSignal::Interrupt,
        Signal::SIGQUIT => TermSignal::Quit,
        Signal::SIGKILL => TermSignal::Kill,
        other => TermSignal::Other(other as i32),
    }
}

/// A pid reported by `waitpid` that no registered job owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownPid(pub Pid);

/// Apply one change to the process that owns `pid`, printing what the
/// change makes visible:
///
/// - a stop that leaves the whole job stopped prints the job's block;
/// - a continue that leaves the whole job running prints the block;
/// - an interrupt prints only a newline;
/// - a quit that completes the job prints the block.
///
/// Re-reports of a status the process already has print nothing.
pub(crate) fn apply_event(
    table: &mut JobTable,
    reporter: &mut Reporter,
    pid: Pid,
    change: StatusChange,
) -> Result<(), UnknownPid> {
    let job = table.find_by_pid_mut(pid).ok_or(UnknownPid(pid))?;
    let process = job.process_by_pid_mut(pid).ok_or(UnknownPid(pid))?;

    let before = process.status();
    let after = process.apply(change);
    let changed = before != after;
    tracing::trace!(pid = pid.as_raw(), job = %job.id(), %before, %after, "status change");

    match change {
        StatusChange::Stopped if changed && job.is_stopped() => {
            reporter.newline();
            reporter.status_block(&job.info());
        }
        StatusChange::Continued if changed && job.is_running() => {
            reporter.status_block(&job.info());
        }
        StatusChange::Signaled(TermSignal::Interrupt) if changed => reporter.newline(),
        StatusChange::Signaled(TermSignal::Quit) if changed && job.is_completed() => {
            reporter.newline();
            reporter.status_block(&job.info());
        }
        _ => {}
    }
    Ok(())
}

/// Collect every pending child-state change without blocking.
///
/// Stops early on a pid nobody owns (reported as an inconsistency). Once the
/// queue is empty and no foreground job is executing, completed jobs are
/// reaped right away. Returns the number of changes applied.
pub(crate) fn drain(table: &mut JobTable, reporter: &mut Reporter) -> usize {
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    let mut applied = 0;

    loop {
        match waitpid(None::<Pid>, Some(flags)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                let Some((pid, change)) = classify(status) else {
                    continue;
                };
                if let Err(UnknownPid(pid)) = apply_event(table, reporter, pid, change) {
                    tracing::warn!(pid = pid.as_raw(), "status change for unknown child");
                    reporter.error(&format!("no child process {pid}"));
                    break;
                }
                applied += 1;
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(e) => {
                reporter.error(&format!("waitpid: {e}"));
                break;
            }
        }
    }

    if !table.any_foreground_active() {
        reap_completed(table, reporter, ReapSource::Reactor);
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ExecMode, Job, Process, ProcessStatus};
    use nix::sys::wait::{waitid, Id};
    use rstest::rstest;
    use std::sync::Mutex;

    // `drain` reaps any child of the test process.
    static CHILDREN: Mutex<()> = Mutex::new(());

    #[rstest]
    #[case(WaitStatus::Exited(Pid::from_raw(7), 0), StatusChange::Exited(0))]
    #[case(WaitStatus::Exited(Pid::from_raw(7), 2), StatusChange::Exited(2))]
    #[case(WaitStatus::Stopped(Pid::from_raw(7), Signal::SIGTSTP), StatusChange::Stopped)]
    #[case(WaitStatus::Continued(Pid::from_raw(7)), StatusChange::Continued)]
    #[case(
        WaitStatus::Signaled(Pid::from_raw(7), Signal::SIGINT, false),
        StatusChange::Signaled(TermSignal::Interrupt)
    )]
    #[case(
        WaitStatus::Signaled(Pid::from_raw(7), Signal::SIGQUIT, true),
        StatusChange::Signaled(TermSignal::Quit)
    )]
    #[case(
        WaitStatus::Signaled(Pid::from_raw(7), Signal::SIGKILL, false),
        StatusChange::Signaled(TermSignal::Kill)
    )]
    #[case(
        WaitStatus::Signaled(Pid::from_raw(7), Signal::SIGTERM, false),
        StatusChange::Signaled(TermSignal::Other(15))
    )]
    fn test_classify(#[case] status: WaitStatus, #[case] expected: StatusChange) {
        assert_eq!(classify(status), Some((Pid::from_raw(7), expected)));
    }

    #[test]
    fn test_classify_still_alive() {
        assert_eq!(classify(WaitStatus::StillAlive), None);
    }

    /// A registered job whose stages carry fake pids starting at `first`.
    fn table_with(commands: &[&str], first: i32, mode: ExecMode) -> JobTable {
        let mut job = Job::new();
        for cmd in commands {
            job.append(Process::new(cmd, None, None).unwrap());
        }
        for (i, p) in job.processes_mut().iter_mut().enumerate() {
            p.set_pid(Pid::from_raw(first + i as i32));
            p.mark_launched();
        }
        job.adopt_pgid(Pid::from_raw(first));
        let mut table = JobTable::new();
        table.register(job, mode);
        table
    }

    #[test]
    fn test_unknown_pid() {
        let mut table = table_with(&["a"], 100, ExecMode::Background);
        let (mut reporter, _) = Reporter::capture();
        let result = apply_event(&mut table, &mut reporter, Pid::from_raw(5), StatusChange::Exited(0));
        assert_eq!(result, Err(UnknownPid(Pid::from_raw(5))));
    }

    #[test]
    fn test_stop_prints_when_job_stops() {
        let mut table = table_with(&["a", "b"], 100, ExecMode::Foreground);
        let (mut reporter, handle) = Reporter::capture();

        apply_event(&mut table, &mut reporter, Pid::from_raw(100), StatusChange::Stopped).unwrap();
        assert_eq!(handle.out(), "");

        apply_event(&mut table, &mut reporter, Pid::from_raw(101), StatusChange::Stopped).unwrap();
        assert_eq!(handle.out(), "\n[1] 100 suspended a |\n    101 suspended b\n");

        // A repeated report changes nothing and prints nothing.
        handle.take();
        apply_event(&mut table, &mut reporter, Pid::from_raw(101), StatusChange::Stopped).unwrap();
        assert_eq!(handle.out(), "");
    }

    #[test]
    fn test_continue_prints_when_job_runs() {
        let mut table = table_with(&["a"], 100, ExecMode::Foreground);
        let (mut reporter, handle) = Reporter::capture();
        apply_event(&mut table, &mut reporter, Pid::from_raw(100), StatusChange::Stopped).unwrap();
        handle.take();

        apply_event(&mut table, &mut reporter, Pid::from_raw(100), StatusChange::Continued).unwrap();
        assert_eq!(handle.out(), "[1] 100 continued a\n");
    }

    #[test]
    fn test_interrupt_prints_newline_only() {
        let mut table = table_with(&["a"], 100, ExecMode::Foreground);
        let (mut reporter, handle) = Reporter::capture();
        apply_event(
            &mut table,
            &mut reporter,
            Pid::from_raw(100),
            StatusChange::Signaled(TermSignal::Interrupt),
        )
        .unwrap();
        assert_eq!(handle.out(), "\n");
        let job = table.iter().next().unwrap();
        assert_eq!(job.processes()[0].status(), ProcessStatus::Terminated);
    }

    #[test]
    fn test_quit_prints_when_job_completes() {
        let mut table = table_with(&["a", "b"], 100, ExecMode::Foreground);
        let (mut reporter, handle) = Reporter::capture();
        let quit = StatusChange::Signaled(TermSignal::Quit);

        apply_event(&mut table, &mut reporter, Pid::from_raw(100), quit).unwrap();
        assert_eq!(handle.out(), "");
        apply_event(&mut table, &mut reporter, Pid::from_raw(101), quit).unwrap();
        assert_eq!(handle.out(), "\n[1] 100 quit a |\n    101 quit b\n");
    }

    #[test]
    fn test_exit_and_kill_are_silent() {
        let mut table = table_with(&["a", "b"], 100, ExecMode::Background);
        let (mut reporter, handle) = Reporter::capture();
        apply_event(&mut table, &mut reporter, Pid::from_raw(100), StatusChange::Exited(0)).unwrap();
        apply_event(
            &mut table,
            &mut reporter,
            Pid::from_raw(101),
            StatusChange::Signaled(TermSignal::Kill),
        )
        .unwrap();
        assert_eq!(handle.out(), "");
        assert!(table.iter().next().unwrap().is_completed());
    }

    /// A job of one stage with a fake pid, already in `status`.
    fn job_in(pid: i32, change: Option<StatusChange>) -> Job {
        let mut job = Job::new();
        job.append(Process::new("a", None, None).unwrap());
        job.processes_mut()[0].set_pid(Pid::from_raw(pid));
        job.processes_mut()[0].mark_launched();
        if let Some(change) = change {
            job.processes_mut()[0].apply(change);
        }
        job.adopt_pgid(Pid::from_raw(pid));
        job
    }

    /// Spawn `true` and wait until it is a zombie, leaving it unreaped.
    fn exited_child() -> Pid {
        let child = std::process::Command::new("true").spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32);
        waitid(Id::Pid(pid), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT).unwrap();
        pid
    }

    #[test]
    fn test_drain_holds_reaping_while_foreground_runs() {
        let _children = CHILDREN.lock().unwrap_or_else(|e| e.into_inner());
        let mut table = JobTable::new();
        let fg = table.register(job_in(i32::MAX - 10, None), ExecMode::Foreground);
        let bg = table.register(job_in(i32::MAX - 20, Some(StatusChange::Exited(0))), ExecMode::Background);
        let (mut reporter, handle) = Reporter::capture();

        assert_eq!(drain(&mut table, &mut reporter), 0);
        assert!(table.get(bg).is_some(), "reaped under a running foreground job");
        assert_eq!(handle.out(), "");

        table.get_mut(fg).unwrap().processes_mut()[0].apply(StatusChange::Stopped);
        drain(&mut table, &mut reporter);
        assert!(table.get(bg).is_none());
        assert!(table.get(fg).is_some(), "a stopped job stays registered");
        assert!(handle.out().contains("done"), "out was {:?}", handle.out());
    }

    #[test]
    fn test_drain_stops_at_unknown_pid() {
        let _children = CHILDREN.lock().unwrap_or_else(|e| e.into_inner());
        let first = exited_child();
        let second = exited_child();
        let mut table = JobTable::new();
        let (mut reporter, handle) = Reporter::capture();

        // One pass consumes exactly one of the strays, then gives up.
        assert_eq!(drain(&mut table, &mut reporter), 0);
        let (_, err) = handle.take();
        assert_eq!(err.matches("no child process").count(), 1, "err was {err:?}");

        drain(&mut table, &mut reporter);
        let (_, err2) = handle.take();
        assert_eq!(err2.matches("no child process").count(), 1, "err was {err2:?}");

        let reported = format!("{err}{err2}");
        assert!(reported.contains(&first.to_string()), "{reported:?}");
        assert!(reported.contains(&second.to_string()), "{reported:?}");

        // Nothing left to collect.
        drain(&mut table, &mut reporter);
        assert_eq!(handle.err(), "");
    }
}
