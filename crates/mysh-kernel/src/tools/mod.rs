//! Tool system for mysh.
//!
//! Builtins are the commands the shell runs itself instead of forking:
//! directory changes, output helpers and the job-control front end.
//! Anything that is not a registered tool is parsed as a pipeline.
//!
//! # Architecture
//!
//! ```text
//! ToolRegistry
//! ├── Shell builtins (cd, echo, clr, help, quit)
//! └── Job builtins   (jobs, fg, kill) ──▶ ExecContext.jobs: JobControl
//! ```

mod builtin;
mod context;
mod registry;
mod traits;

pub use builtin::register_builtins;
pub use context::ExecContext;
pub use registry::ToolRegistry;
pub use traits::{Tool, ToolArgs, ToolSchema};
