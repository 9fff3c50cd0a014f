//! Shell configuration.

use std::io::IsTerminal;

/// Configuration for [`Shell`](crate::Shell) initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Put the shell in its own process group, claim the terminal and ignore
    /// the interactive job-control signals.
    ///
    /// Only takes effect when stdin is a terminal.
    pub job_control: bool,

    /// ANSI colors in job reports.
    pub color: bool,
}

/// Colors unless stdout is redirected or `NO_COLOR` is set.
fn default_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self::interactive()
    }
}

impl ShellConfig {
    /// Config for a user at a terminal.
    pub fn interactive() -> Self {
        Self {
            job_control: std::io::stdin().is_terminal(),
            color: default_color(),
        }
    }

    /// Config for running a batch file. Job control still applies when a
    /// terminal is attached, since batch lines may start foreground jobs.
    pub fn batch() -> Self {
        Self {
            job_control: std::io::stdin().is_terminal(),
            color: default_color(),
        }
    }

    /// No terminal handling, no colors. For tests.
    pub fn testing() -> Self {
        Self {
            job_control: false,
            color: false,
        }
    }

    /// Enable or disable colored reports.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Enable or disable job control.
    pub fn with_job_control(mut self, job_control: bool) -> Self {
        self.job_control = job_control;
        self
    }
}
