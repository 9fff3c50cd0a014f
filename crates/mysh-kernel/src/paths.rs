//! Filesystem locations mysh uses.
//!
//! | Purpose | Source | Fallback |
//! |---------|--------|----------|
//! | Home (for bare `cd`) | `$HOME` | `/` |
//! | Data | `$XDG_DATA_HOME` via `directories` | `~/.local/share` |
//! | History | `<data>/mysh/history.txt` | |

use std::path::PathBuf;

use directories::BaseDirs;

/// The user's home directory: `$HOME`, or `/` if unset.
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Platform data directory (`$XDG_DATA_HOME` on Linux).
pub fn xdg_data_home() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| home_dir().join(".local").join("share"))
}

/// `<data>/mysh`.
pub fn data_dir() -> PathBuf {
    xdg_data_home().join("mysh")
}

/// Where the REPL keeps line history.
pub fn history_path() -> PathBuf {
    data_dir().join("history.txt")
}
