//! Execution context for tools.

use crate::scheduler::{JobControl, Reporter};

use super::traits::ToolSchema;

/// Execution context passed to tools.
///
/// Owns the job-control core, so `jobs`, `fg`, `kill` and `quit` reach the
/// same registry the pipeline path uses.
#[derive(Debug)]
pub struct ExecContext {
    /// Registry, terminal and reporter.
    pub jobs: JobControl,
    /// Tool schemas for the help command.
    pub tool_schemas: Vec<ToolSchema>,
    /// Set by `quit`; the front end stops reading lines.
    pub exit_requested: bool,
}

impl ExecContext {
    /// Create a new execution context around a job-control core.
    pub fn new(jobs: JobControl) -> Self {
        Self {
            jobs,
            tool_schemas: Vec::new(),
            exit_requested: false,
        }
    }

    /// A context with no terminal whose reports go nowhere.
    pub fn detached() -> Self {
        let (reporter, _) = Reporter::capture();
        Self::new(JobControl::new(None, reporter))
    }

    /// Set the available tool schemas (for help command).
    pub fn set_tool_schemas(&mut self, schemas: Vec<ToolSchema>) {
        self.tool_schemas = schemas;
    }
}
