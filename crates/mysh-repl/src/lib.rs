//! mysh REPL — interactive and batch front end for the mysh kernel.
//!
//! One tokio task on a current-thread runtime owns the [`Shell`] and waits on
//! three things at once:
//!
//! ```text
//!            ┌── next line (reader thread) ──▶ Shell::execute
//!  select! ──┼── SIGCHLD (ChildEvents) ──────▶ Shell::handle_child_events
//!            └── tick ───────────────────────▶ Shell::collect_output
//! ```
//!
//! Foreground jobs block that task inside `Shell::execute`, which is fine:
//! nothing else may touch the job table meanwhile, and any SIGCHLD that
//! arrives is picked up on the next turn of the loop.

mod reader;
mod sink;

use std::cell::Cell;
use std::io::IsTerminal;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use tokio::time::{interval, MissedTickBehavior};

use mysh_kernel::{ChildEvents, ExecResult, Reporter, Shell, ShellConfig};

pub use reader::{LineReader, ReadEvent};
pub use sink::{PromptSink, PromptState};

/// How often background capture pipes are emptied.
const CAPTURE_TICK: Duration = Duration::from_millis(100);

/// A shell plus the glue the front end needs around it.
#[derive(Debug)]
pub struct Repl {
    shell: Shell,
}

impl Repl {
    /// Shell reporting to stdio.
    pub fn new(config: ShellConfig) -> Result<Self> {
        let shell = Shell::new(config).context("Failed to initialize the shell")?;
        Ok(Self { shell })
    }

    pub fn with_reporter(config: ShellConfig, reporter: Reporter) -> Result<Self> {
        let shell = Shell::with_reporter(config, reporter).context("Failed to initialize the shell")?;
        Ok(Self { shell })
    }

    /// Run one line. Only failures the shell cannot continue after are `Err`.
    pub fn process_line(&mut self, line: &str) -> Result<ExecResult> {
        Ok(self.shell.execute(line)?)
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut Shell {
        &mut self.shell
    }

    /// `quit` ran.
    pub fn should_exit(&self) -> bool {
        self.shell.exit_requested()
    }

    /// Block (without spinning) until no job is left that could still make
    /// progress. Stopped jobs are left for [`Repl::finish`].
    pub async fn wait_for_background(&mut self, events: &mut ChildEvents) {
        let mut tick = interval(CAPTURE_TICK);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.shell.jobs().table().iter().any(|job| !job.is_stopped()) {
            tokio::select! {
                Some(()) = events.recv() => {
                    self.shell.handle_child_events();
                }
                _ = tick.tick() => {
                    self.shell.collect_output();
                    self.shell.handle_child_events();
                }
            }
        }
    }

    /// Run every non-blank line of `source`, echoing each as `> line`, then
    /// wait for background jobs. Stops early on `quit` or a fatal error.
    pub async fn run_lines(&mut self, source: &str, events: &mut ChildEvents) -> Result<()> {
        for line in source.lines() {
            if line.trim().is_empty() {
                continue;
            }
            println!("> {line}");
            let result = self.process_line(line)?;
            print_result(&result);
            self.shell.handle_child_events();
            if self.should_exit() {
                return Ok(());
            }
        }
        self.wait_for_background(events).await;
        Ok(())
    }

    /// Kill whatever is still registered.
    pub fn finish(&mut self) {
        self.shell.shutdown();
    }
}

impl Drop for Repl {
    /// No job outlives the front end, however it returns.
    fn drop(&mut self) {
        self.finish();
    }
}

/// `user@cwd~$ `.
pub fn prompt_text(user: &str, cwd: &Path) -> String {
    format!("{user}@{}~$ ", cwd.display())
}

/// Printed once when an interactive session starts on a terminal.
pub fn welcome_banner() -> String {
    format!(
        "Welcome to mysh {}\n\
         Run programs in the foreground or in the background (`&`), chain them\n\
         with `|` and redirect with `<` and `>`. Ctrl-C, Ctrl-Z and Ctrl-\\ reach\n\
         the foreground job; `jobs`, `fg %N` and `kill %N` manage the rest.\n\
         Type `help` for the builtins.\n\n",
        env!("CARGO_PKG_VERSION")
    )
}

fn current_prompt() -> String {
    let user = std::env::var("USER").unwrap_or_else(|_| "mysh".to_string());
    let cwd = std::env::current_dir().unwrap_or_default();
    prompt_text(&user, &cwd)
}

/// Print what a builtin or a failed submission produced.
fn print_result(result: &ExecResult) {
    if !result.out.is_empty() {
        print!("{}", result.out);
    }
    if !result.err.is_empty() {
        if result.err.ends_with('\n') {
            eprint!("{}", result.err);
        } else {
            eprintln!("{}", result.err);
        }
    }
}

fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}

/// Run the interactive shell until `quit` or Ctrl-D.
pub fn run(config: ShellConfig) -> Result<()> {
    runtime()?.block_on(interactive(config))
}

async fn interactive(config: ShellConfig) -> Result<()> {
    // Before any fork: SIGCHLD sent earlier would be lost.
    let mut events = ChildEvents::new().context("Failed to watch SIGCHLD")?;

    let (mut reader, printer) = LineReader::spawn(Some(mysh_kernel::history_path()))?;
    let prompting: PromptState = Rc::new(Cell::new(false));
    let sink = PromptSink::new(printer, prompting.clone());
    let reporter = Reporter::new(Box::new(sink), config.color);
    let mut repl = Repl::with_reporter(config, reporter)?;

    let mut tick = interval(CAPTURE_TICK);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if std::io::stdin().is_terminal() {
        print!("{}", welcome_banner());
    }
    reader.request(current_prompt())?;
    prompting.set(true);

    let outcome = loop {
        tokio::select! {
            event = reader.next() => {
                prompting.set(false);
                match event {
                    Some(ReadEvent::Line(line)) => match repl.process_line(&line) {
                        Ok(result) => print_result(&result),
                        Err(e) => break Err(e),
                    },
                    Some(ReadEvent::Interrupted) => {}
                    Some(ReadEvent::Eof) | None => break Ok(()),
                }
                if repl.should_exit() {
                    break Ok(());
                }
                repl.shell_mut().handle_child_events();
                if let Err(e) = reader.request(current_prompt()) {
                    break Err(e);
                }
                prompting.set(true);
            }
            Some(()) = events.recv() => {
                repl.shell_mut().handle_child_events();
            }
            _ = tick.tick() => {
                repl.shell_mut().collect_output();
            }
        }
    };

    prompting.set(false);
    repl.finish();
    reader.close();
    outcome
}

/// Run every line of `path`, echoing each as `> line`, then wait for
/// background jobs.
pub fn run_batch(path: &Path, config: ShellConfig) -> Result<()> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file: {}", path.display()))?;

    runtime()?.block_on(async move {
        let mut events = ChildEvents::new().context("Failed to watch SIGCHLD")?;
        let mut repl = Repl::new(config)?;

        let outcome = repl.run_lines(&source, &mut events).await;
        repl.finish();
        outcome
    })
}
