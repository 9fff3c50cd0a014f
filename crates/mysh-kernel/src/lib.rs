//! mysh-kernel: the job-control core of mysh.
//!
//! This crate provides:
//!
//! - **Parser**: Splits a command line into pipeline stages, redirections and mode
//! - **Scheduler**: Job registry, launcher, SIGCHLD reactor, job waiter and reaper
//! - **Terminal**: Process-group and controlling-terminal ownership
//! - **Tools**: Tool trait, registry, and the builtin commands
//! - **Shell**: Builtin dispatch in front of the scheduler
//! - **Paths**: XDG-compliant path helpers

pub mod config;
pub mod error;
pub mod parser;
pub mod paths;
pub mod scheduler;
pub mod shell;
pub mod terminal;
pub mod tools;

pub use config::ShellConfig;
pub use error::{JobError, JobResult};
pub use mysh_types::ExecResult;
pub use parser::{parse_pipeline, Pipeline, StageSpec};
pub use scheduler::{ChildEvents, JobControl, Reporter};
pub use shell::Shell;

// XDG path primitives
pub use paths::{data_dir, history_path, home_dir, xdg_data_home};
