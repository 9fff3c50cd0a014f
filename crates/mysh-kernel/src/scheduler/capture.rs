//! Capture channels for background jobs.
//!
//! A background job must not write over the prompt, so its stdout and stderr
//! go into pipes that only the shell reads. Its stdin comes from a third pipe
//! whose write end is closed at creation: readers see EOF instead of fighting
//! the foreground for the terminal.
//!
//! ```text
//!   stage 1 ─┐ stderr                     shell (non-blocking reads)
//!   stage 2 ─┼────────────▶ err pipe ──▶ pull() ─▶ buffer ─▶ finish() ─▶ Reporter
//!   stage N ─┘ stdout ────▶ out pipe ──▶
//! ```
//!
//! The shell's copies of the write ends are dropped by [`Capture::seal`] once
//! every stage is forked, so a read returns end-of-stream exactly when the
//! last writer (a child) has exited.

use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsFd, OwnedFd};

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::unistd::pipe2;

use crate::error::{JobError, JobResult};

/// Bytes pulled out of a capture channel in one pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Drained {
    pub out: Vec<u8>,
    pub err: Vec<u8>,
}

impl Drained {
    pub fn is_empty(&self) -> bool {
        self.out.is_empty() && self.err.is_empty()
    }
}

/// Output and input pipes owned by one background job.
#[derive(Debug)]
pub struct Capture {
    stdin: Option<OwnedFd>,
    out_write: Option<OwnedFd>,
    err_write: Option<OwnedFd>,
    out_read: Stream,
    err_read: Stream,
    buffered: Drained,
}

impl Capture {
    /// Create the three pipes. Failure here is resource exhaustion.
    pub fn open() -> JobResult<Self> {
        let (stdin, stdin_write) = pipe2(OFlag::O_CLOEXEC).map_err(JobError::Pipe)?;
        drop(stdin_write);

        let (out_read, out_write) = pipe2(OFlag::O_CLOEXEC).map_err(JobError::Pipe)?;
        let (err_read, err_write) = pipe2(OFlag::O_CLOEXEC).map_err(JobError::Pipe)?;

        Ok(Self {
            stdin: Some(stdin),
            out_write: Some(out_write),
            err_write: Some(err_write),
            out_read: Stream::new(out_read)?,
            err_read: Stream::new(err_read)?,
            buffered: Drained::default(),
        })
    }

    /// A descriptor a stage can read as stdin (always at EOF).
    pub(crate) fn stdin(&self) -> JobResult<Option<OwnedFd>> {
        dup_opt(self.stdin.as_ref())
    }

    /// A descriptor for the terminal stage's stdout.
    pub(crate) fn stdout(&self) -> JobResult<Option<OwnedFd>> {
        dup_opt(self.out_write.as_ref())
    }

    /// A descriptor for any stage's stderr.
    pub(crate) fn stderr(&self) -> JobResult<Option<OwnedFd>> {
        dup_opt(self.err_write.as_ref())
    }

    /// Drop the shell's copies of everything handed to children.
    pub(crate) fn seal(&mut self) {
        self.stdin = None;
        self.out_write = None;
        self.err_write = None;
    }

    /// Read every byte available right now without blocking.
    pub fn collect(&mut self) -> io::Result<Drained> {
        Ok(Drained {
            out: self.out_read.read_available()?,
            err: self.err_read.read_available()?,
        })
    }

    /// Move available bytes into the job's buffer so a chatty job never
    /// fills its pipe and stalls. Called periodically while the job runs.
    pub fn pull(&mut self) -> io::Result<()> {
        let drained = self.collect()?;
        self.buffered.out.extend_from_slice(&drained.out);
        self.buffered.err.extend_from_slice(&drained.err);
        Ok(())
    }

    /// Wait up to `timeout_ms` for either output pipe to become readable,
    /// then [`Capture::pull`]. Returns early on a signal.
    ///
    /// Lets a caller that is waiting on the job keep its pipes moving.
    pub fn pull_when_ready(&mut self, timeout_ms: u16) -> io::Result<()> {
        let mut fds: Vec<PollFd<'_>> = [&self.out_read, &self.err_read]
            .into_iter()
            .filter(|s| !s.eof)
            .map(|s| PollFd::new(s.file.as_fd(), PollFlags::POLLIN))
            .collect();
        match poll(&mut fds, PollTimeout::from(timeout_ms)) {
            Ok(_) | Err(Errno::EINTR) => {}
            Err(e) => return Err(e.into()),
        }
        drop(fds);
        self.pull()
    }

    /// Everything buffered so far plus whatever is readable now. Called by
    /// the reaper once every process of the job has been reaped.
    pub fn finish(&mut self) -> io::Result<Drained> {
        self.pull()?;
        Ok(std::mem::take(&mut self.buffered))
    }

    /// Stop reading: both pipes count as finished from now on. Whatever was
    /// buffered is still handed out by [`Capture::finish`].
    pub(crate) fn abandon(&mut self) {
        self.out_read.eof = true;
        self.err_read.eof = true;
    }

    /// True once both output pipes reported end-of-stream.
    pub fn is_finished(&self) -> bool {
        self.out_read.eof && self.err_read.eof
    }
}

fn dup_opt(fd: Option<&OwnedFd>) -> JobResult<Option<OwnedFd>> {
    match fd {
        Some(fd) => Ok(Some(fd.try_clone()?)),
        None => Ok(None),
    }
}

/// Non-blocking read end of a capture pipe.
#[derive(Debug)]
struct Stream {
    file: File,
    eof: bool,
}

impl Stream {
    fn new(fd: OwnedFd) -> JobResult<Self> {
        set_nonblocking(&fd)?;
        Ok(Self {
            file: File::from(fd),
            eof: false,
        })
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let mut collected = Vec::new();
        let mut chunk = [0u8; 4096];
        while !self.eof {
            match self.file.read(&mut chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => collected.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(collected)
    }
}

/// Only the shell's read ends become non-blocking; the flag lives on the
/// open file description, so the write ends the children use stay blocking.
fn set_nonblocking(fd: &OwnedFd) -> JobResult<()> {
    let flags = fcntl(fd.as_fd(), FcntlArg::F_GETFL).map_err(JobError::Pipe)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd.as_fd(), FcntlArg::F_SETFL(flags)).map_err(JobError::Pipe)?;
    Ok(())
}

/// A pipe whose write end is already closed: reading it yields EOF at once.
pub(crate) fn empty_pipe() -> JobResult<OwnedFd> {
    let (read, write) = pipe2(OFlag::O_CLOEXEC).map_err(JobError::Pipe)?;
    drop(write);
    Ok(read)
}
