//! mysh CLI entry point.
//!
//! Usage:
//!   mysh                 # Interactive shell
//!   mysh <batchfile>     # Run a file line by line

use std::env;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use mysh_kernel::ShellConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("mysh: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.as_slice() {
        [] => {
            mysh_repl::run(ShellConfig::interactive())?;
            Ok(ExitCode::SUCCESS)
        }

        [flag] if flag == "--help" || flag == "-h" => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }

        [flag] if flag == "--version" || flag == "-V" => {
            println!("mysh {} ({})", env!("CARGO_PKG_VERSION"), env!("MYSH_GIT_HASH"));
            Ok(ExitCode::SUCCESS)
        }

        [unknown] if unknown.starts_with('-') => {
            eprintln!("Unknown option: {unknown}");
            eprintln!("Run 'mysh --help' for usage.");
            Ok(ExitCode::FAILURE)
        }

        [path] => {
            mysh_repl::run_batch(Path::new(path), ShellConfig::batch())?;
            Ok(ExitCode::SUCCESS)
        }

        _ => {
            eprintln!("usage: mysh [batchfile]");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!(
        r#"mysh v{}

Usage:
  mysh                 Interactive shell
  mysh <batchfile>     Run each line of a file, then wait for background jobs

Options:
  -h, --help           Show this help
  -V, --version        Show version

Logging goes to stderr, filtered by RUST_LOG (e.g. RUST_LOG=mysh_kernel=debug).
"#,
        env!("CARGO_PKG_VERSION")
    );
}
