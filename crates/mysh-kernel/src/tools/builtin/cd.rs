//! cd — Change working directory.

use std::path::PathBuf;

use mysh_types::ExecResult;

use crate::error::io_reason;
use crate::paths::home_dir;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

/// Cd tool: change the shell's working directory.
///
/// This is the process working directory, so every job launched afterwards
/// starts there. `PWD` and `OLDPWD` follow it.
pub struct Cd;

impl Tool for Cd {
    fn name(&self) -> &str {
        "cd"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("cd", "Change the working directory (- for the previous one)").usage("cd [dir|-]")
    }

    fn execute(&self, args: ToolArgs, _ctx: &mut ExecContext) -> ExecResult {
        if args.len() > 1 {
            return ExecResult::failure(1, "cd: too many arguments");
        }

        let back = args.get_positional(0) == Some("-");
        let target: PathBuf = match args.get_positional(0) {
            None | Some("~") => home_dir(),
            Some("-") => match std::env::var_os("OLDPWD") {
                Some(prev) => PathBuf::from(prev),
                None => return ExecResult::failure(1, "cd: OLDPWD not set"),
            },
            Some(path) => match path.strip_prefix("~/") {
                Some(rest) => home_dir().join(rest),
                None => PathBuf::from(path),
            },
        };

        let previous = std::env::current_dir().ok();
        if let Err(e) = std::env::set_current_dir(&target) {
            return ExecResult::failure(1, format!("cd: {}: {}", io_reason(&e), target.display()));
        }

        if let Some(previous) = previous {
            std::env::set_var("OLDPWD", previous);
        }
        let now = std::env::current_dir().unwrap_or(target);
        std::env::set_var("PWD", &now);

        // Like bash, `cd -` prints where it went.
        if back {
            ExecResult::success(format!("{}\n", now.display()))
        } else {
            ExecResult::success("")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // The working directory is process-wide.
    static CWD_LOCK: Mutex<()> = Mutex::new(());

    fn run(args: &str) -> ExecResult {
        let mut ctx = ExecContext::detached();
        Cd.execute(ToolArgs::parse(args), &mut ctx)
    }

    #[test]
    fn test_cd_and_back() {
        let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let start = std::env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().canonicalize().unwrap();

        let result = run(target.to_str().unwrap());
        assert!(result.ok(), "{}", result.err);
        assert_eq!(std::env::current_dir().unwrap().canonicalize().unwrap(), target);
        assert_eq!(std::env::var_os("PWD").map(PathBuf::from).unwrap(), target);

        let result = run("-");
        assert!(result.ok());
        assert_eq!(result.out.trim_end(), start.display().to_string());
        assert_eq!(std::env::current_dir().unwrap(), start);
    }

    #[test]
    fn test_cd_missing_dir() {
        let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let start = std::env::current_dir().unwrap();

        let result = run("/definitely/not/here");
        assert_eq!(result.code, 1);
        assert_eq!(result.err, "cd: no such file or directory: /definitely/not/here");
        assert_eq!(std::env::current_dir().unwrap(), start);
    }

    #[test]
    fn test_cd_too_many_arguments() {
        let result = run("a b");
        assert_eq!(result.code, 1);
        assert_eq!(result.err, "cd: too many arguments");
    }
}
