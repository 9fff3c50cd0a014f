//! Core tool traits and types.

use mysh_types::ExecResult;

use super::context::ExecContext;

/// Schema describing a tool's interface, for `help`.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    /// Tool name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Usage line, e.g. `fg %N`.
    pub usage: Option<String>,
}

impl ToolSchema {
    /// Create a new tool schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            usage: None,
        }
    }

    /// Set the usage line.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }
}

/// Arguments of one builtin invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    /// Text after the tool name, trimmed.
    pub raw: String,
    /// `raw` split on whitespace.
    pub positional: Vec<String>,
}

impl ToolArgs {
    /// Create empty args.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split the text following a tool name.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        Self {
            raw: raw.to_string(),
            positional: raw.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Get a positional argument by index.
    pub fn get_positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    /// `--name` appears among the arguments.
    pub fn has_flag(&self, name: &str) -> bool {
        self.positional
            .iter()
            .any(|a| a.strip_prefix("--") == Some(name))
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }
}

/// A tool that can be executed.
///
/// Builtins run on the shell's own thread and may block (`fg` waits for its
/// job), so the trait is synchronous.
pub trait Tool {
    /// The tool's name (used for lookup).
    fn name(&self) -> &str;

    /// Get the tool's schema.
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with the given arguments and context.
    fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult;
}

/// `%N` → job id. Bare numbers are process ids, which builtins reject.
pub(crate) fn parse_job_ref(tool: &str, target: Option<&str>) -> Result<crate::scheduler::JobId, ExecResult> {
    let Some(target) = target else {
        return Err(ExecResult::failure(1, format!("{tool}: usage: {tool} %N")));
    };
    match target.strip_prefix('%') {
        Some(num) => num
            .parse::<u64>()
            .map(crate::scheduler::JobId)
            .map_err(|_| ExecResult::failure(1, format!("{tool}: invalid job reference: {target}"))),
        None if target.parse::<i32>().is_ok() => Err(ExecResult::failure(
            1,
            format!("{tool}: process ids are not supported, use %N"),
        )),
        None => Err(ExecResult::failure(1, format!("{tool}: invalid job reference: {target}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::JobId;
    use rstest::rstest;

    #[test]
    fn test_parse_args() {
        let args = ToolArgs::parse("  --json  extra ");
        assert_eq!(args.raw, "--json  extra");
        assert_eq!(args.positional, vec!["--json", "extra"]);
        assert!(args.has_flag("json"));
        assert!(!args.has_flag("extra"));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_job_ref() {
        assert_eq!(parse_job_ref("fg", Some("%3")).unwrap(), JobId(3));
    }

    #[rstest]
    #[case(None, "fg: usage: fg %N")]
    #[case(Some("1234"), "fg: process ids are not supported, use %N")]
    #[case(Some("%x"), "fg: invalid job reference: %x")]
    #[case(Some("abc"), "fg: invalid job reference: abc")]
    fn test_bad_job_refs(#[case] target: Option<&str>, #[case] message: &str) {
        let err = parse_job_ref("fg", target).unwrap_err();
        assert_eq!(err.code, 1);
        assert_eq!(err.err, message);
    }
}
