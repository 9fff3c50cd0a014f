//! The Shell: builtins in front of the job-control core.
//!
//! ```text
//! line ──▶ Shell::execute ─┬─ builtin? ──▶ Tool::execute(ctx)
//!                          └─ otherwise ─▶ parse_pipeline ─▶ JobControl::submit_pipeline
//! ```
//!
//! The front end owns the read loop and the SIGCHLD stream; it calls
//! [`Shell::handle_child_events`] whenever a notification arrives and
//! [`Shell::collect_output`] on a timer.

use mysh_types::ExecResult;

use crate::config::ShellConfig;
use crate::error::JobResult;
use crate::parser::parse_pipeline;
use crate::scheduler::{JobControl, Reporter};
use crate::terminal::Terminal;
use crate::tools::{register_builtins, ExecContext, ToolArgs, ToolRegistry};

/// A shell instance.
#[derive(Debug)]
pub struct Shell {
    tools: ToolRegistry,
    ctx: ExecContext,
}

impl Shell {
    /// Set up job control (if configured and stdin is a terminal) and report
    /// to the process's stdout/stderr.
    pub fn new(config: ShellConfig) -> JobResult<Self> {
        let reporter = Reporter::stdio(config.color);
        Self::with_reporter(config, reporter)
    }

    /// Like [`Shell::new`] with reports going to `reporter`.
    pub fn with_reporter(config: ShellConfig, reporter: Reporter) -> JobResult<Self> {
        let terminal = if config.job_control {
            Terminal::init()?
        } else {
            None
        };
        tracing::debug!(job_control = terminal.is_some(), color = config.color, "shell initialized");

        let mut tools = ToolRegistry::new();
        register_builtins(&mut tools);

        let mut ctx = ExecContext::new(JobControl::new(terminal, reporter));
        ctx.set_tool_schemas(tools.schemas());

        Ok(Self { tools, ctx })
    }

    /// Run one line.
    ///
    /// A builtin runs in the shell; anything else becomes a job. Syntax
    /// errors and job-level failures come back as a failed [`ExecResult`];
    /// only failures that leave the shell unable to continue are `Err`.
    pub fn execute(&mut self, line: &str) -> JobResult<ExecResult> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ExecResult::default());
        }

        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        if let Some(tool) = self.tools.get(name) {
            tracing::debug!(builtin = name, "dispatch");
            return Ok(tool.execute(ToolArgs::parse(rest), &mut self.ctx));
        }

        let pipeline = match parse_pipeline(line) {
            Ok(pipeline) => pipeline,
            Err(e) => return Ok(ExecResult::failure(2, format!("mysh: {e}"))),
        };

        match self.ctx.jobs.submit_pipeline(&pipeline) {
            Ok(id) => {
                tracing::debug!(job = %id, "submitted");
                Ok(ExecResult::default())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(ExecResult::failure(1, format!("mysh: {e}"))),
        }
    }

    /// `quit` ran.
    pub fn exit_requested(&self) -> bool {
        self.ctx.exit_requested
    }

    pub fn jobs(&self) -> &JobControl {
        &self.ctx.jobs
    }

    pub fn jobs_mut(&mut self) -> &mut JobControl {
        &mut self.ctx.jobs
    }

    /// See [`JobControl::handle_child_events`].
    pub fn handle_child_events(&mut self) -> usize {
        self.ctx.jobs.handle_child_events()
    }

    /// See [`JobControl::collect_output`].
    pub fn collect_output(&mut self) {
        self.ctx.jobs.collect_output();
    }

    /// Kill whatever is still registered.
    pub fn shutdown(&mut self) {
        if self.ctx.jobs.has_jobs() {
            tracing::info!(jobs = self.ctx.jobs.table().len(), "killing remaining jobs");
        }
        self.ctx.jobs.kill_all_jobs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::CaptureHandle;

    fn test_shell() -> (Shell, CaptureHandle) {
        let (reporter, handle) = Reporter::capture();
        let shell = Shell::with_reporter(ShellConfig::testing(), reporter).unwrap();
        (shell, handle)
    }

    #[test]
    fn test_empty_line() {
        let (mut shell, _) = test_shell();
        let result = shell.execute("   ").unwrap();
        assert!(result.ok());
        assert_eq!(result.out, "");
    }

    #[test]
    fn test_builtin_dispatch() {
        let (mut shell, _) = test_shell();
        let result = shell.execute("echo  one two").unwrap();
        assert_eq!(result.out, "one two\n");
        assert!(!shell.jobs().has_jobs());
    }

    #[test]
    fn test_syntax_error() {
        let (mut shell, _) = test_shell();
        let result = shell.execute("a & | b").unwrap();
        assert_eq!(result.code, 2);
        assert_eq!(result.err, "mysh: bad use of '&' and '|' in command");
        assert!(!shell.jobs().has_jobs());
    }

    #[test]
    fn test_quit_requests_exit() {
        let (mut shell, _) = test_shell();
        assert!(!shell.exit_requested());
        shell.execute("quit").unwrap();
        assert!(shell.exit_requested());
    }

    #[test]
    fn test_help_knows_builtins() {
        let (mut shell, _) = test_shell();
        let result = shell.execute("help").unwrap();
        for name in ["cd", "clr", "echo", "fg", "jobs", "kill", "quit"] {
            assert!(result.out.contains(name), "help is missing {name}");
        }
    }
}
