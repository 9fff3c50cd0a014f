//! jobs — List registered jobs.

use mysh_types::ExecResult;

use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

/// Jobs tool: one status block per registered job, or a JSON snapshot.
pub struct Jobs;

impl Tool for Jobs {
    fn name(&self) -> &str {
        "jobs"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("jobs", "List jobs with their processes and status").usage("jobs [--json]")
    }

    fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        if args.has_flag("json") && args.len() == 1 {
            return match serde_json::to_string_pretty(&ctx.jobs.snapshot()) {
                Ok(json) => ExecResult::success(format!("{json}\n")),
                Err(e) => ExecResult::failure(1, format!("jobs: {e}")),
            };
        }
        if let Some(arg) = args.get_positional(0) {
            return ExecResult::failure(1, format!("jobs: unexpected argument: {arg}"));
        }
        ExecResult::success(ctx.jobs.list_jobs())
    }
}
