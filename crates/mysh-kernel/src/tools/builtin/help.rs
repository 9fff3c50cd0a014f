//! help — Builtins and pipeline syntax.

use std::fmt::Write;

use mysh_types::ExecResult;

use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

const SYNTAX: &str = "\
Anything else is run as a pipeline:
  prog args [< in] | prog args ... [> out] [&]
  Ctrl-C interrupts, Ctrl-Z stops, Ctrl-\\ quits the foreground job.
";

/// Help tool: usage of every builtin, or of one.
pub struct Help;

impl Tool for Help {
    fn name(&self) -> &str {
        "help"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("help", "Show builtins and pipeline syntax").usage("help [builtin]")
    }

    fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        match args.get_positional(0) {
            None => ExecResult::success(format_help(&ctx.tool_schemas)),
            Some(name) => match ctx.tool_schemas.iter().find(|s| s.name == name) {
                Some(schema) => ExecResult::success(format!("{}\n", format_entry(schema))),
                None => ExecResult::failure(1, format!("help: no builtin named {name}")),
            },
        }
    }
}

fn format_entry(schema: &ToolSchema) -> String {
    let usage = schema.usage.as_deref().unwrap_or(&schema.name);
    format!("  {usage:<24} {}", schema.description)
}

fn format_help(schemas: &[ToolSchema]) -> String {
    let mut out = String::from("Builtins:\n");
    for schema in schemas {
        let _ = writeln!(out, "{}", format_entry(schema));
    }
    out.push('\n');
    out.push_str(SYNTAX);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_schemas() -> ExecContext {
        let mut ctx = ExecContext::detached();
        ctx.set_tool_schemas(vec![
            ToolSchema::new("fg", "Continue a job in the foreground").usage("fg %N"),
            ToolSchema::new("quit", "Kill all jobs and exit the shell"),
        ]);
        ctx
    }

    #[test]
    fn test_help_lists_builtins() {
        let mut ctx = ctx_with_schemas();
        let result = Help.execute(ToolArgs::new(), &mut ctx);
        assert!(result.ok());
        assert!(result.out.starts_with("Builtins:\n"));
        assert!(result.out.contains("fg %N"));
        assert!(result.out.contains("  quit "));
        assert!(result.out.contains("Ctrl-Z stops"));
    }

    #[test]
    fn test_help_single() {
        let mut ctx = ctx_with_schemas();
        let result = Help.execute(ToolArgs::parse("fg"), &mut ctx);
        assert!(result.ok());
        assert!(result.out.contains("Continue a job"));
        assert!(!result.out.contains("quit"));

        let result = Help.execute(ToolArgs::parse("ls"), &mut ctx);
        assert_eq!(result.err, "help: no builtin named ls");
    }
}
