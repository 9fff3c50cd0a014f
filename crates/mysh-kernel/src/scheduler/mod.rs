//! Scheduler module for mysh: jobs, pipelines and their process groups.
//!
//! This module provides:
//! - **Registry**: jobs and their processes, ids, lookups and the aggregate
//!   completed/running/stopped predicates.
//! - **Launcher**: a wiring plan built as data, then executed with one
//!   `fork` per stage, all stages in one process group.
//! - **Reactor and waiter**: status transitions from `waitpid`, either
//!   drained after SIGCHLD or awaited for one job.
//! - **Reporting and reaping**: status blocks, captured background output,
//!   freeing completed jobs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       JobControl                            │
//! │  table: JobTable      terminal: Option<Terminal>            │
//! │  - submit_pipeline(pipeline) → JobId                        │
//! │  - resume_job_foreground(JobId)                             │
//! │  - kill_job(JobId) / kill_all_jobs()                        │
//! │  - handle_child_events()   (after SIGCHLD)                  │
//! │  - list_jobs() → String                                     │
//! └─────────────────────────────────────────────────────────────┘
//!
//!  stage 1 ──pipe──▶ stage 2 ──pipe──▶ stage 3      one process group
//!  (fork)            (fork)            (fork)       pgid = pid of stage 1
//! ```

mod capture;
mod control;
mod launch;
mod plan;
mod reactor;
mod registry;
mod report;
mod waiter;

pub use mysh_types::{ExecMode, JobId, JobInfo, ProcessInfo, ProcessStatus, StatusChange, TermSignal};

pub use capture::{Capture, Drained};
pub use control::JobControl;
pub use plan::{InputSource, OutputSink, SkipReason, StageAction, StagePlan, WiringPlan};
pub use reactor::{classify, ChildEvents, UnknownPid};
pub use registry::{Job, JobTable, Process};
pub use report::{
    format_job_list, format_launch_listing, format_status_block, CaptureHandle, ReapSource,
    ReportSink, Reporter, StdioSink,
};
pub use waiter::WaitUntil;
