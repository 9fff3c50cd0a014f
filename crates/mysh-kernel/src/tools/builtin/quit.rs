//! quit — Kill all jobs and leave the shell.

use mysh_types::ExecResult;

use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

/// Quit tool.
pub struct Quit;

impl Tool for Quit {
    fn name(&self) -> &str {
        "quit"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("quit", "Kill all jobs and exit the shell").usage("quit")
    }

    fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        if !args.is_empty() {
            return ExecResult::failure(1, "quit: takes no arguments");
        }
        ctx.jobs.kill_all_jobs();
        ctx.exit_requested = true;
        ExecResult::success("")
    }
}
