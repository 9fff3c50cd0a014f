//! Command-line parser: turns one input line into a pipeline description.
//!
//! The grammar is deliberately small:
//!
//! ```text
//! line     := pipeline [ '&' ]
//! pipeline := stage ( '|' stage )*
//! stage    := word+ [ '<' word ] [ '>' word ]
//! ```
//!
//! A trailing `&` selects background execution. An `&` anywhere else is an
//! error, and `& |` gets its own error because it reads like an attempt to
//! background a stage in the middle of a pipeline.

use std::path::PathBuf;

use crate::error::{JobError, JobResult};
use crate::scheduler::ExecMode;

/// Target of a `<` or `>` redirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// A path followed the operator.
    Path(PathBuf),
    /// The operator was present but no word followed it.
    Missing,
}

/// One stage of a pipeline, before it becomes a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// Command text without redirections, e.g. `grep -n foo`.
    pub command: String,
    /// `< path`, if given.
    pub input: Option<Redirect>,
    /// `> path`, if given.
    pub output: Option<Redirect>,
}

impl StageSpec {
    /// A stage with no redirections.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            input: None,
            output: None,
        }
    }
}

/// An ordered list of stages plus the mode the whole job runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<StageSpec>,
    pub mode: ExecMode,
}

/// Parse a raw command line into a [`Pipeline`].
pub fn parse_pipeline(line: &str) -> JobResult<Pipeline> {
    let (body, mode) = split_mode(line)?;

    let stages = body
        .split('|')
        .map(parse_stage)
        .collect::<JobResult<Vec<_>>>()?;

    Ok(Pipeline { stages, mode })
}

/// Strip a trailing `&` and reject every other use of it.
fn split_mode(line: &str) -> JobResult<(&str, ExecMode)> {
    let trimmed = line.trim();
    let (body, mode) = match trimmed.strip_suffix('&') {
        Some(rest) => (rest.trim_end(), ExecMode::Background),
        None => (trimmed, ExecMode::Foreground),
    };

    if let Some(idx) = body.find('&') {
        let next = body[idx + 1..].trim_start().chars().next();
        return Err(match next {
            Some('|') => JobError::MixedBackgroundPipe,
            _ => JobError::UnexpectedAmpersand,
        });
    }

    Ok((body, mode))
}

fn parse_stage(text: &str) -> JobResult<StageSpec> {
    let command_end = text.find(|c| c == '<' || c == '>').unwrap_or(text.len());
    let command = text[..command_end].split_whitespace().collect::<Vec<_>>().join(" ");
    if command.is_empty() {
        return Err(JobError::EmptyCommand);
    }

    Ok(StageSpec {
        input: redirect_after(text, '<'),
        output: redirect_after(text, '>'),
        ..StageSpec::new(command)
    })
}

/// The word following the first `marker`, if the marker appears at all.
fn redirect_after(text: &str, marker: char) -> Option<Redirect> {
    let start = text.find(marker)? + marker.len_utf8();
    let rest = text[start..].trim_start_matches(marker).trim_start();
    let word: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '<' && *c != '>')
        .collect();

    if word.is_empty() {
        Some(Redirect::Missing)
    } else {
        Some(Redirect::Path(PathBuf::from(word)))
    }
}
