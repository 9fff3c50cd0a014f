//! fg — Resume a job in the foreground.

use mysh_types::ExecResult;

use crate::tools::traits::parse_job_ref;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

/// Fg tool: continue job `%N` with the terminal and wait for it.
pub struct Fg;

impl Tool for Fg {
    fn name(&self) -> &str {
        "fg"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("fg", "Continue a job in the foreground").usage("fg %N")
    }

    fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        if args.len() > 1 {
            return ExecResult::failure(1, "fg: too many arguments");
        }
        let id = match parse_job_ref("fg", args.get_positional(0)) {
            Ok(id) => id,
            Err(result) => return result,
        };

        match ctx.jobs.resume_job_foreground(id) {
            Ok(()) => ExecResult::success(""),
            Err(e) => ExecResult::failure(1, format!("fg: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fg_unknown_job() {
        let mut ctx = ExecContext::detached();
        let result = Fg.execute(ToolArgs::parse("%7"), &mut ctx);
        assert_eq!(result.code, 1);
        assert_eq!(result.err, "fg: job 7 not found");
        assert!(!ctx.jobs.has_jobs());
    }

    #[test]
    fn test_fg_requires_job_ref() {
        let mut ctx = ExecContext::detached();
        let result = Fg.execute(ToolArgs::new(), &mut ctx);
        assert_eq!(result.err, "fg: usage: fg %N");
    }
}
