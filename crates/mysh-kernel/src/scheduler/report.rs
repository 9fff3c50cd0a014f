//! Job reports and the reaper.
//!
//! Reports are user-facing text (status blocks, launch listings, drained
//! background output), not log events. They go through a [`Reporter`] so the
//! front end decides where they land: straight to stdio, through the line
//! editor while a prompt is showing, or into a buffer in tests.

use std::io::Write;
use std::sync::{Arc, Mutex};

use super::{JobInfo, JobTable};

const BLUE: &str = "\x1b[34m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Destination for report text.
pub trait ReportSink {
    /// Text meant for standard output.
    fn out(&mut self, text: &str);
    /// Text meant for standard error.
    fn err(&mut self, text: &str);
}

/// Writes to the process's stdout and stderr, ignoring write failures.
#[derive(Debug, Default)]
pub struct StdioSink;

impl ReportSink for StdioSink {
    fn out(&mut self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn err(&mut self, text: &str) {
        let _ = std::io::stderr().write_all(text.as_bytes());
    }
}

/// Everything a capturing reporter has written so far.
#[derive(Debug, Default)]
struct Captured {
    out: String,
    err: String,
}

/// Read side of [`Reporter::capture`].
#[derive(Debug, Clone, Default)]
pub struct CaptureHandle(Arc<Mutex<Captured>>);

impl CaptureHandle {
    pub fn out(&self) -> String {
        self.0.lock().map(|c| c.out.clone()).unwrap_or_default()
    }

    pub fn err(&self) -> String {
        self.0.lock().map(|c| c.err.clone()).unwrap_or_default()
    }

    /// Return and clear what was captured on both streams.
    pub fn take(&self) -> (String, String) {
        match self.0.lock() {
            Ok(mut c) => (std::mem::take(&mut c.out), std::mem::take(&mut c.err)),
            Err(_) => Default::default(),
        }
    }
}

impl ReportSink for CaptureHandle {
    fn out(&mut self, text: &str) {
        if let Ok(mut c) = self.0.lock() {
            c.out.push_str(text);
        }
    }

    fn err(&mut self, text: &str) {
        if let Ok(mut c) = self.0.lock() {
            c.err.push_str(text);
        }
    }
}

/// Formats job reports and hands them to a sink.
pub struct Reporter {
    sink: Box<dyn ReportSink>,
    color: bool,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").field("color", &self.color).finish_non_exhaustive()
    }
}

impl Reporter {
    pub fn new(sink: Box<dyn ReportSink>, color: bool) -> Self {
        Self { sink, color }
    }

    pub fn stdio(color: bool) -> Self {
        Self::new(Box::new(StdioSink), color)
    }

    /// An uncolored reporter writing into memory.
    pub fn capture() -> (Self, CaptureHandle) {
        let handle = CaptureHandle::default();
        (Self::new(Box::new(handle.clone()), false), handle)
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color && !text.is_empty() {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    /// `[id] pid status command`, one line per stage.
    pub fn status_block(&mut self, job: &JobInfo) {
        let text = self.paint(BLUE, &format_status_block(job));
        self.sink.out(&format!("{text}\n"));
    }

    /// `[id] pid command`, printed when a background job starts.
    pub fn launch_listing(&mut self, job: &JobInfo) {
        let text = self.paint(BLUE, &format_launch_listing(job));
        self.sink.out(&format!("{text}\n"));
    }

    /// A user-visible error, prefixed with the shell name.
    pub fn error(&mut self, message: &str) {
        let text = self.paint(RED, &format!("mysh: {message}"));
        self.sink.err(&format!("{text}\n"));
    }

    /// Spacing so a report does not run into whatever is on the line.
    pub fn newline(&mut self) {
        self.sink.out("\n");
    }

    /// Bytes a background job wrote while nobody was looking.
    pub fn drained(&mut self, out: &[u8], err: &[u8]) {
        if !err.is_empty() {
            let text = self.paint(RED, &String::from_utf8_lossy(err));
            self.sink.err(&text);
        }
        if !out.is_empty() {
            let text = self.paint(YELLOW, &String::from_utf8_lossy(out));
            self.sink.out(&text);
        }
    }
}

fn pid_text(pid: Option<i32>) -> String {
    pid.map_or_else(|| "-".to_string(), |p| p.to_string())
}

fn format_stages(job: &JobInfo, with_status: bool) -> String {
    let lines: Vec<String> = job
        .processes
        .iter()
        .map(|p| {
            let command = p.argv.join(" ");
            if with_status {
                format!("{} {} {}", pid_text(p.pid), p.status, command)
            } else {
                format!("{} {}", pid_text(p.pid), command)
            }
        })
        .collect();
    format!("[{}] {}", job.id, lines.join(" |\n    "))
}

/// Status block for one job, without a trailing newline.
pub fn format_status_block(job: &JobInfo) -> String {
    format_stages(job, true)
}

/// Launch listing for one job, without a trailing newline.
pub fn format_launch_listing(job: &JobInfo) -> String {
    format_stages(job, false)
}

/// Listing for `jobs`: one status block per job, empty when there are none.
pub fn format_job_list(jobs: &[JobInfo]) -> String {
    jobs.iter()
        .map(|j| format!("{}\n", format_status_block(j)))
        .collect()
}

/// What triggered a reaper pass; decides whether and how blocks print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapSource {
    /// A child-state notification while the shell was idle.
    Reactor,
    /// A foreground job just stopped or finished.
    Foreground,
    /// `fg` brought a job back and it stopped or finished.
    ResumeForeground,
    /// `kill` or shell exit.
    Kill,
}

impl ReapSource {
    fn prints(self, job: &JobInfo) -> bool {
        job.mode == super::ExecMode::Background
            || matches!(self, ReapSource::ResumeForeground | ReapSource::Kill)
    }
}

/// Free every completed job, printing its final block when the source
/// calls for it and draining its captured output.
///
/// Returns the number of jobs removed.
pub(crate) fn reap_completed(table: &mut JobTable, reporter: &mut Reporter, source: ReapSource) -> usize {
    let done: Vec<_> = table
        .iter()
        .filter(|j| j.is_completed())
        .map(|j| j.id())
        .collect();

    for id in &done {
        let Some(mut job) = table.remove(*id) else {
            continue;
        };
        let info = job.info();
        if source.prints(&info) {
            if source == ReapSource::Reactor {
                reporter.newline();
            }
            reporter.status_block(&info);
        }

        if let Some(capture) = job.capture_mut() {
            match capture.finish() {
                Ok(drained) => reporter.drained(&drained.out, &drained.err),
                Err(e) => tracing::warn!(job = %id, error = %e, "draining capture failed"),
            }
        }
        tracing::debug!(job = %id, ?source, "reaped");
    }

    done.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ExecMode, JobId, ProcessInfo, ProcessStatus};

    fn info(mode: ExecMode, stages: &[(Option<i32>, ProcessStatus, &str)]) -> JobInfo {
        JobInfo {
            id: JobId(3),
            pgid: stages.first().and_then(|s| s.0),
            mode,
            processes: stages
                .iter()
                .map(|(pid, status, cmd)| ProcessInfo {
                    pid: *pid,
                    status: *status,
                    argv: cmd.split_whitespace().map(String::from).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_single_stage_block() {
        let job = info(ExecMode::Background, &[(Some(812), ProcessStatus::Running, "sleep 5")]);
        assert_eq!(format_status_block(&job), "[3] 812 running sleep 5");
    }

    #[test]
    fn test_multi_stage_block() {
        let job = info(
            ExecMode::Foreground,
            &[
                (Some(10), ProcessStatus::Suspended, "cat notes"),
                (Some(11), ProcessStatus::Suspended, "wc -l"),
            ],
        );
        assert_eq!(
            format_status_block(&job),
            "[3] 10 suspended cat notes |\n    11 suspended wc -l"
        );
    }

    #[test]
    fn test_unforked_stage_shows_dash() {
        let job = info(
            ExecMode::Foreground,
            &[
                (None, ProcessStatus::Terminated, "cat"),
                (Some(20), ProcessStatus::Done, "wc"),
            ],
        );
        assert_eq!(format_status_block(&job), "[3] - terminated cat |\n    20 done wc");
    }

    #[test]
    fn test_launch_listing_omits_status() {
        let job = info(
            ExecMode::Background,
            &[(Some(5), ProcessStatus::Running, "ls"), (Some(6), ProcessStatus::Running, "wc")],
        );
        assert_eq!(format_launch_listing(&job), "[3] 5 ls |\n    6 wc");
    }

    #[test]
    fn test_job_list_empty() {
        assert_eq!(format_job_list(&[]), "");
    }

    #[test]
    fn test_capture_reporter() {
        let (mut reporter, handle) = Reporter::capture();
        let job = info(ExecMode::Background, &[(Some(1), ProcessStatus::Done, "true")]);
        reporter.status_block(&job);
        reporter.error("job 9 not found");
        reporter.drained(b"out\n", b"err\n");

        assert_eq!(handle.out(), "[3] 1 done true\nout\n");
        assert_eq!(handle.err(), "mysh: job 9 not found\nerr\n");
    }

    #[test]
    fn test_color_wraps_blocks() {
        let handle = CaptureHandle::default();
        let mut reporter = Reporter::new(Box::new(handle.clone()), true);
        let job = info(ExecMode::Background, &[(Some(1), ProcessStatus::Done, "true")]);
        reporter.status_block(&job);
        reporter.drained(b"x", b"");
        assert_eq!(handle.out(), "\x1b[34m[3] 1 done true\x1b[0m\n\x1b[33mx\x1b[0m");
    }

    #[test]
    fn test_print_policy() {
        let bg = info(ExecMode::Background, &[(Some(1), ProcessStatus::Done, "true")]);
        let fg = info(ExecMode::Foreground, &[(Some(1), ProcessStatus::Done, "true")]);

        assert!(ReapSource::Reactor.prints(&bg));
        assert!(ReapSource::Foreground.prints(&bg));
        assert!(!ReapSource::Foreground.prints(&fg));
        assert!(!ReapSource::Reactor.prints(&fg));
        assert!(ReapSource::ResumeForeground.prints(&fg));
        assert!(ReapSource::Kill.prints(&fg));
    }
}
