//! clr — Clear the terminal.

use mysh_types::ExecResult;

use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

/// Erase display, cursor home.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Clr tool: clear the screen.
pub struct Clr;

impl Tool for Clr {
    fn name(&self) -> &str {
        "clr"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("clr", "Clear the terminal").usage("clr")
    }

    fn execute(&self, args: ToolArgs, _ctx: &mut ExecContext) -> ExecResult {
        if !args.is_empty() {
            return ExecResult::failure(1, "clr: takes no arguments");
        }
        ExecResult::success(CLEAR_SCREEN)
    }
}
