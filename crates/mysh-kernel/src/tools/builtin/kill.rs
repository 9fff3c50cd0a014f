//! kill — Kill every process of a job.

use mysh_types::ExecResult;

use crate::tools::traits::parse_job_ref;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

/// Kill tool: SIGKILL job `%N` and wait until all of it is gone.
pub struct Kill;

impl Tool for Kill {
    fn name(&self) -> &str {
        "kill"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("kill", "Kill every process of a job").usage("kill %N")
    }

    fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        if args.len() > 1 {
            return ExecResult::failure(1, "kill: too many arguments");
        }
        let id = match parse_job_ref("kill", args.get_positional(0)) {
            Ok(id) => id,
            Err(result) => return result,
        };

        match ctx.jobs.kill_job(id) {
            Ok(()) => ExecResult::success(""),
            Err(e) => ExecResult::failure(1, format!("kill: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_unknown_job() {
        let mut ctx = ExecContext::detached();
        let result = Kill.execute(ToolArgs::parse("%3"), &mut ctx);
        assert_eq!(result.code, 1);
        assert_eq!(result.err, "kill: job 3 not found");
    }

    #[test]
    fn test_kill_rejects_pid() {
        let mut ctx = ExecContext::detached();
        let result = Kill.execute(ToolArgs::parse("4242"), &mut ctx);
        assert_eq!(result.err, "kill: process ids are not supported, use %N");
    }
}
