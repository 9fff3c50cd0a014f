//! Error type for the job-control core.

use nix::errno::Errno;
use thiserror::Error;

use crate::scheduler::JobId;

/// Errors raised while parsing, launching or controlling jobs.
///
/// Only [`JobError::is_fatal`] errors should end the shell; everything else is
/// scoped to one command line, job or stage.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("bad use of '&' and '|' in command")]
    MixedBackgroundPipe,
    #[error("unexpected '&' in command")]
    UnexpectedAmpersand,
    #[error("empty command in pipeline")]
    EmptyCommand,
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("pipe: {0}")]
    Pipe(Errno),
    #[error("fork: {0}")]
    Fork(Errno),
    #[error("couldn't put the shell in its own process group: {0}")]
    ShellGroup(Errno),
    #[error("terminal control: {0}")]
    Terminal(Errno),
    #[error("cannot signal job {job}: {source}")]
    Signal { job: JobId, source: Errno },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    /// Resource exhaustion or a shell without its own process group leaves
    /// the process tree in an unknown state; nothing can continue after it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JobError::Pipe(_) | JobError::Fork(_) | JobError::ShellGroup(_)
        )
    }
}

/// Result type for job-control operations.
pub type JobResult<T> = Result<T, JobError>;

/// Short, shell-style wording for an I/O failure on a path.
pub(crate) fn io_reason(err: &std::io::Error) -> String {
    match err.kind() {
        std::io::ErrorKind::NotFound => "no such file or directory".to_string(),
        std::io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        _ => err.to_string(),
    }
}
