//! Process launcher: executes a [`WiringPlan`] for a registered job.
//!
//! For each planned stage the parent opens the descriptors the plan names,
//! forks, and drops its copies. Every descriptor is close-on-exec, so a child
//! ends up with exactly the three standard descriptors it was given.

use std::ffi::{c_char, CString};
use std::fs::{File, OpenOptions};
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::libc;
use nix::fcntl::OFlag;
use nix::unistd::{dup2_stderr, dup2_stdin, dup2_stdout, fork, getpid, pipe2, setpgid, tcsetpgrp, write, ForkResult, Pid};

use super::capture::{empty_pipe, Capture};
use super::plan::{InputSource, OutputSink, StageAction, WiringPlan};
use super::report::Reporter;
use super::{ExecMode, Job};
use crate::error::{io_reason, JobError, JobResult};
use crate::terminal::{restore_default_signals, tty_fd};

/// Descriptors one child is started with. `None` keeps the shell's own.
#[derive(Debug)]
struct StageFds {
    stdin: Option<OwnedFd>,
    stdout: Option<OwnedFd>,
    stderr: Option<OwnedFd>,
}

/// Everything the child needs, prepared before fork so the child never
/// allocates: another thread may hold the allocator lock at fork time.
struct ChildImage {
    argv: Vec<CString>,
    /// Null-terminated pointers into `argv`, in the shape `execvp` takes.
    argv_ptrs: Vec<*const c_char>,
    not_found: Vec<u8>,
}

impl ChildImage {
    fn new(argv: &[String]) -> Option<Self> {
        let argv = argv
            .iter()
            .map(|a| CString::new(a.as_bytes()).ok())
            .collect::<Option<Vec<_>>>()?;
        let program = argv.first()?.to_string_lossy();
        let not_found = format!("mysh: {program}: command not found\n").into_bytes();
        // CString data lives on the heap, so the pointers survive moving `argv`.
        let argv_ptrs = argv
            .iter()
            .map(|a| a.as_ptr())
            .chain(std::iter::once(std::ptr::null()))
            .collect();
        Some(Self {
            argv,
            argv_ptrs,
            not_found,
        })
    }
}

/// Fork one process per launchable stage of `job`.
///
/// Stages the plan skips, and stages whose redirection file cannot be
/// opened, are marked Terminated and reported; wiring continues with the
/// next stage. Only pipe and fork failures abort.
#[tracing::instrument(level = "debug", skip_all, fields(job = %job.id()))]
pub(crate) fn launch_job(
    job: &mut Job,
    plan: &WiringPlan,
    claim_terminal: bool,
    reporter: &mut Reporter,
) -> JobResult<()> {
    let mut capture = if plan.needs_capture() {
        Some(Capture::open()?)
    } else {
        None
    };
    let mut carried: Option<OwnedFd> = None;

    for (idx, stage) in plan.stages().iter().enumerate() {
        let from_previous = carried.take();

        let (input, output) = match &stage.action {
            StageAction::Skip(reason) => {
                job.processes_mut()[idx].mark_launch_failed();
                reporter.error(&reason.to_string());
                continue;
            }
            StageAction::Launch { input, output } => (input, output),
        };

        let stdin = match input {
            InputSource::Inherit => None,
            InputSource::PreviousStage => Some(match from_previous {
                Some(fd) => fd,
                None => empty_pipe()?,
            }),
            InputSource::Empty => Some(empty_pipe()?),
            InputSource::Capture => match &capture {
                Some(c) => c.stdin()?,
                None => None,
            },
            InputSource::File(path) => match File::open(path) {
                Ok(file) => Some(OwnedFd::from(file)),
                Err(e) => {
                    skip_stage(job, idx, reporter, path, &e);
                    continue;
                }
            },
        };

        let stdout = match output {
            OutputSink::Inherit => None,
            OutputSink::NextStage => {
                let (read, write) = pipe2(OFlag::O_CLOEXEC).map_err(JobError::Pipe)?;
                carried = Some(read);
                Some(write)
            }
            OutputSink::Capture => match &capture {
                Some(c) => c.stdout()?,
                None => None,
            },
            OutputSink::File(path) => match open_output(path) {
                Ok(file) => Some(OwnedFd::from(file)),
                Err(e) => {
                    skip_stage(job, idx, reporter, path, &e);
                    continue;
                }
            },
        };

        let stderr = match &capture {
            Some(c) => c.stderr()?,
            None => None,
        };
        let fds = StageFds {
            stdin,
            stdout,
            stderr,
        };

        let Some(image) = ChildImage::new(job.processes()[idx].argv()) else {
            job.processes_mut()[idx].mark_launch_failed();
            reporter.error(&format!("{}: invalid argument", job.processes()[idx].command()));
            carried = None;
            continue;
        };

        let foreground_tty = claim_terminal && plan.mode() == ExecMode::Foreground;
        job.processes_mut()[idx].mark_launched();

        // SAFETY: the child only makes async-signal-safe calls before exec
        // or _exit; everything it touches was prepared above.
        match unsafe { fork() }.map_err(JobError::Fork)? {
            ForkResult::Child => exec_child(job.pgid(), foreground_tty, fds, &image),
            ForkResult::Parent { child } => {
                job.processes_mut()[idx].set_pid(child);
                let pgid = job.adopt_pgid(child);
                // The child does the same; whichever runs first wins, and the
                // loser fails harmlessly once the child has exec'd.
                let _ = setpgid(child, pgid);
                tracing::debug!(pid = child.as_raw(), pgid = pgid.as_raw(), "forked stage");
            }
        }
        // The parent's copies in `fds` close here.
    }

    if let Some(capture) = capture.as_mut() {
        capture.seal();
    }
    job.attach_capture(capture);
    Ok(())
}

fn skip_stage(job: &mut Job, idx: usize, reporter: &mut Reporter, path: &Path, err: &std::io::Error) {
    tracing::debug!(path = %path.display(), error = %err, "redirection failed");
    job.processes_mut()[idx].mark_launch_failed();
    reporter.error(&format!("{}: {}", io_reason(err), path.display()));
}

/// `> path`: created with mode 0644 if absent, truncated otherwise.
fn open_output(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
}

/// Child side of the fork. Never returns.
fn exec_child(pgid: Option<Pid>, foreground_tty: bool, fds: StageFds, image: &ChildImage) -> ! {
    let pid = getpid();
    let group = pgid.unwrap_or(pid);
    let _ = setpgid(pid, group);
    if foreground_tty {
        let _ = tcsetpgrp(tty_fd(), group);
    }
    restore_default_signals();

    if let Some(fd) = &fds.stdin {
        let _ = dup2_stdin(fd);
    }
    if let Some(fd) = &fds.stdout {
        let _ = dup2_stdout(fd);
    }
    if let Some(fd) = &fds.stderr {
        let _ = dup2_stderr(fd);
    }

    if let Some(program) = image.argv.first() {
        // SAFETY: `argv_ptrs` is null-terminated and points into `image.argv`,
        // which outlives the call. Returns only on failure.
        unsafe { libc::execvp(program.as_ptr(), image.argv_ptrs.as_ptr()) };
    }
    // SAFETY: fd 2 is open (possibly just redirected) for the whole child.
    let stderr = unsafe { std::os::fd::BorrowedFd::borrow_raw(libc::STDERR_FILENO) };
    let _ = write(stderr, &image.not_found);
    // SAFETY: _exit skips atexit handlers and destructors that belong to the shell.
    unsafe { libc::_exit(127) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_image() {
        let image = ChildImage::new(&["grep".to_string(), "-n".to_string()]).unwrap();
        assert_eq!(image.argv.len(), 2);
        assert_eq!(image.argv_ptrs.len(), 3);
        assert!(image.argv_ptrs[2].is_null());
        // SAFETY: the pointer refers to a CString owned by `image`.
        let first = unsafe { std::ffi::CStr::from_ptr(image.argv_ptrs[0]) };
        assert_eq!(first.to_bytes(), b"grep");
        assert_eq!(image.not_found, b"mysh: grep: command not found\n");
    }

    #[test]
    fn test_child_image_rejects_nul() {
        assert!(ChildImage::new(&["a\0b".to_string()]).is_none());
    }

    #[test]
    fn test_open_output_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old contents").unwrap();
        drop(open_output(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_open_output_creates_0644() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.txt");
        drop(open_output(&path).unwrap());
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        // umask may only remove bits.
        assert_eq!(mode & !0o644, 0);
        assert!(mode & 0o600 == 0o600);
    }
}
