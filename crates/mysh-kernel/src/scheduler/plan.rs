//! Wiring plan: where each stage reads from and writes to, decided up front.
//!
//! The launcher never decides descriptors on the fly. It first builds a
//! [`WiringPlan`] from the parsed stages (pure data, no descriptors opened),
//! then walks the plan opening and forking. Skipped stages are decided here,
//! so the continue-after-missing-file policy is testable without forking.

use std::path::{Path, PathBuf};

use super::ExecMode;
use crate::parser::{Redirect, StageSpec};

/// Where a stage's stdin comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// The shell's own stdin (first stage of a foreground job).
    Inherit,
    /// `< path`.
    File(PathBuf),
    /// Read end of the pipe written by the previous stage.
    PreviousStage,
    /// A pipe with no writer; reads hit EOF at once.
    Empty,
    /// The background job's capture input (also EOF at once).
    Capture,
}

/// Where a stage's stdout goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    /// The shell's own stdout (last stage of a foreground job).
    Inherit,
    /// `> path`, created if absent and truncated.
    File(PathBuf),
    /// Write end of a fresh pipe read by the next stage.
    NextStage,
    /// The background job's capture output.
    Capture,
}

/// Why a stage will not be forked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `< path` names a file that does not exist, or `<` had no word.
    MissingInput(Option<PathBuf>),
    /// `>` had no word.
    MalformedOutput,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingInput(Some(path)) => {
                write!(f, "no such file or directory: {}", path.display())
            }
            SkipReason::MissingInput(None) => write!(f, "no such file or directory"),
            SkipReason::MalformedOutput => write!(f, "parse error near '\\n'"),
        }
    }
}

/// What to do with one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageAction {
    Launch {
        input: InputSource,
        output: OutputSink,
    },
    Skip(SkipReason),
}

/// Plan for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    /// `Pipeline` for every stage but the last; the job's mode for the last.
    pub mode: ExecMode,
    pub action: StageAction,
}

impl StagePlan {
    pub fn input(&self) -> Option<&InputSource> {
        match &self.action {
            StageAction::Launch { input, .. } => Some(input),
            StageAction::Skip(_) => None,
        }
    }

    pub fn output(&self) -> Option<&OutputSink> {
        match &self.action {
            StageAction::Launch { output, .. } => Some(output),
            StageAction::Skip(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.action, StageAction::Skip(_))
    }
}

/// Descriptor assignments for a whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiringPlan {
    mode: ExecMode,
    stages: Vec<StagePlan>,
}

impl WiringPlan {
    /// Plan against the real filesystem.
    pub fn new(stages: &[StageSpec], mode: ExecMode) -> Self {
        Self::build(stages, mode, Path::exists)
    }

    /// Plan with a custom existence check for input files.
    pub fn build(stages: &[StageSpec], mode: ExecMode, input_exists: impl Fn(&Path) -> bool) -> Self {
        let last = stages.len().saturating_sub(1);
        let mut planned: Vec<StagePlan> = Vec::with_capacity(stages.len());

        for (idx, stage) in stages.iter().enumerate() {
            let stage_mode = if idx == last { mode } else { ExecMode::Pipeline };
            let feeds_me = planned
                .last()
                .is_some_and(|prev| prev.output() == Some(&OutputSink::NextStage));

            let action = match plan_input(stage, idx, mode, feeds_me, &input_exists) {
                Err(reason) => StageAction::Skip(reason),
                Ok(input) => match plan_output(stage, idx == last, mode) {
                    Err(reason) => StageAction::Skip(reason),
                    Ok(output) => StageAction::Launch { input, output },
                },
            };

            planned.push(StagePlan {
                mode: stage_mode,
                action,
            });
        }

        Self {
            mode,
            stages: planned,
        }
    }

    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    pub fn stages(&self) -> &[StagePlan] {
        &self.stages
    }

    /// Background jobs read, write and send every stage's stderr through a
    /// capture channel.
    pub fn needs_capture(&self) -> bool {
        self.mode == ExecMode::Background
    }

    /// Nothing will be forked.
    pub fn all_skipped(&self) -> bool {
        self.stages.iter().all(StagePlan::is_skipped)
    }
}

fn plan_input(
    stage: &StageSpec,
    idx: usize,
    mode: ExecMode,
    previous_feeds_me: bool,
    input_exists: &impl Fn(&Path) -> bool,
) -> Result<InputSource, SkipReason> {
    match &stage.input {
        Some(Redirect::Path(path)) if input_exists(path) => Ok(InputSource::File(path.clone())),
        Some(Redirect::Path(path)) => Err(SkipReason::MissingInput(Some(path.clone()))),
        Some(Redirect::Missing) => Err(SkipReason::MissingInput(None)),
        None if idx == 0 => Ok(match mode {
            ExecMode::Background => InputSource::Capture,
            ExecMode::Foreground | ExecMode::Pipeline => InputSource::Inherit,
        }),
        None if previous_feeds_me => Ok(InputSource::PreviousStage),
        None => Ok(InputSource::Empty),
    }
}

fn plan_output(stage: &StageSpec, is_last: bool, mode: ExecMode) -> Result<OutputSink, SkipReason> {
    match &stage.output {
        Some(Redirect::Path(path)) => Ok(OutputSink::File(path.clone())),
        Some(Redirect::Missing) => Err(SkipReason::MalformedOutput),
        None if !is_last => Ok(OutputSink::NextStage),
        None => Ok(match mode {
            ExecMode::Background => OutputSink::Capture,
            ExecMode::Foreground | ExecMode::Pipeline => OutputSink::Inherit,
        }),
    }
}
