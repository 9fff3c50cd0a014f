//! echo — Print arguments to stdout.

use mysh_types::ExecResult;

use crate::error::io_reason;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

/// Echo tool: prints its words, `$NAME` replaced from the environment.
pub struct Echo;

impl Tool for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("echo", "Print words, expanding $NAME").usage("echo words... [> file]")
    }

    fn execute(&self, args: ToolArgs, _ctx: &mut ExecContext) -> ExecResult {
        let (words, target) = match args.raw.split_once('>') {
            Some((words, rest)) => (words, Some(rest.split_whitespace().next().unwrap_or(""))),
            None => (args.raw.as_str(), None),
        };

        let mut output = words
            .split_whitespace()
            .map(expand_word)
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        output.push('\n');

        match target {
            None => ExecResult::success(output),
            Some("") => ExecResult::failure(1, "echo: parse error near '\\n'"),
            Some(path) => match std::fs::write(path, output) {
                Ok(()) => ExecResult::success(""),
                Err(e) => ExecResult::failure(1, format!("echo: {}: {}", io_reason(&e), path)),
            },
        }
    }
}

/// Split `word` on `$`: the text before the first `$` stays as written,
/// every piece after one names a variable (empty when unset). So
/// `pre$HOME` and `$USER$HOME` expand every reference. A lone `$` is kept.
fn expand_word(word: &str) -> String {
    if word == "$" {
        return word.to_string();
    }
    let mut pieces = word.split('$');
    let mut expanded = pieces.next().unwrap_or_default().to_string();
    for name in pieces.filter(|name| !name.is_empty()) {
        expanded.push_str(&std::env::var(name).unwrap_or_default());
    }
    expanded
}
