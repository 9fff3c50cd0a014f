//! `JobControl`: the job-control core behind one facade.
//!
//! Owns the registry, the terminal (when the shell has one) and the report
//! sink. Everything runs on the caller's thread; the only asynchronous input
//! is the SIGCHLD notification, which the front end turns into a call to
//! [`JobControl::handle_child_events`].

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};

use super::launch::launch_job;
use super::plan::WiringPlan;
use super::reactor;
use super::report::{format_job_list, reap_completed, ReapSource, Reporter};
use super::waiter::{wait_for_job, WaitUntil};
use super::{ExecMode, Job, JobId, JobInfo, JobTable, StatusChange};
use crate::error::{JobError, JobResult};
use crate::parser::Pipeline;
use crate::terminal::Terminal;

/// Registry plus the operations the shell front end calls.
#[derive(Debug)]
pub struct JobControl {
    table: JobTable,
    terminal: Option<Terminal>,
    reporter: Reporter,
}

impl JobControl {
    /// `terminal` is `Some` when [`Terminal::init`] succeeded; without it
    /// foreground jobs still get their own process group but no terminal.
    pub fn new(terminal: Option<Terminal>, reporter: Reporter) -> Self {
        Self {
            table: JobTable::new(),
            terminal,
            reporter,
        }
    }

    pub fn table(&self) -> &JobTable {
        &self.table
    }

    pub fn has_jobs(&self) -> bool {
        !self.table.is_empty()
    }

    /// Register and launch a pipeline.
    ///
    /// Foreground jobs block until they stop or finish; background jobs
    /// print their launch listing and return at once.
    #[tracing::instrument(level = "debug", skip_all, fields(mode = %pipeline.mode))]
    pub fn submit_pipeline(&mut self, pipeline: &Pipeline) -> JobResult<JobId> {
        if pipeline.stages.is_empty() {
            return Err(JobError::EmptyCommand);
        }
        let job = Job::from_stages(&pipeline.stages)?;
        let plan = WiringPlan::new(&pipeline.stages, pipeline.mode);

        let id = self.table.register(job, pipeline.mode);
        let job = self.table.get_mut(id).ok_or(JobError::JobNotFound(id))?;
        launch_job(job, &plan, self.terminal.is_some(), &mut self.reporter)?;

        match pipeline.mode {
            ExecMode::Background => {
                let info = job.info();
                self.reporter.launch_listing(&info);
            }
            ExecMode::Foreground | ExecMode::Pipeline => {
                self.wait_in_foreground(id);
                reap_completed(&mut self.table, &mut self.reporter, ReapSource::Foreground);
            }
        }
        Ok(id)
    }

    /// Hand the terminal to the job, block until it stops, take it back.
    fn wait_in_foreground(&mut self, id: JobId) {
        let Some(pgid) = self.table.get(id).and_then(Job::pgid) else {
            return;
        };
        if let Some(terminal) = &self.terminal {
            if let Err(e) = terminal.give_terminal_to(pgid) {
                tracing::warn!(job = %id, error = %e, "could not hand over the terminal");
            }
        }

        wait_for_job(&mut self.table, &mut self.reporter, id, WaitUntil::Stopped);

        if let Some(terminal) = &self.terminal {
            if let Err(e) = terminal.reclaim_terminal() {
                self.reporter.error(&e.to_string());
            }
        }
    }

    /// Snapshot of every registered job, in registration order.
    pub fn snapshot(&self) -> Vec<JobInfo> {
        self.table.iter().map(Job::info).collect()
    }

    /// One status block per job; empty when there are none.
    pub fn list_jobs(&self) -> String {
        format_job_list(&self.snapshot())
    }

    /// Continue job `id` in the foreground and block until it stops or
    /// finishes.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn resume_job_foreground(&mut self, id: JobId) -> JobResult<()> {
        let pgid = self
            .table
            .get(id)
            .and_then(Job::pgid)
            .ok_or(JobError::JobNotFound(id))?;

        if let Some(terminal) = &self.terminal {
            terminal.give_terminal_to(pgid)?;
        }
        if let Err(source) = killpg(pgid, Signal::SIGCONT) {
            if let Some(terminal) = &self.terminal {
                let _ = terminal.reclaim_terminal();
            }
            return Err(JobError::Signal { job: id, source });
        }

        if let Some(job) = self.table.get_mut(id) {
            let mut resumed = false;
            for process in job.processes_mut() {
                if process.status().is_suspended() {
                    process.apply(StatusChange::Continued);
                    resumed = true;
                }
            }
            if resumed && job.is_running() {
                let info = job.info();
                self.reporter.status_block(&info);
            }
        }

        wait_for_job(&mut self.table, &mut self.reporter, id, WaitUntil::Stopped);
        if let Some(terminal) = &self.terminal {
            if let Err(e) = terminal.reclaim_terminal() {
                self.reporter.error(&e.to_string());
            }
        }
        reap_completed(&mut self.table, &mut self.reporter, ReapSource::ResumeForeground);
        Ok(())
    }

    /// SIGKILL every process of job `id`, wait for all of them, reap.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn kill_job(&mut self, id: JobId) -> JobResult<()> {
        let job = self.table.get(id).ok_or(JobError::JobNotFound(id))?;

        if let Some(pgid) = job.pgid() {
            match killpg(pgid, Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(source) => return Err(JobError::Signal { job: id, source }),
            }
            wait_for_job(&mut self.table, &mut self.reporter, id, WaitUntil::Completed);
        }

        reap_completed(&mut self.table, &mut self.reporter, ReapSource::Kill);
        Ok(())
    }

    /// `kill_job` for every registered job. Used on the way out.
    pub fn kill_all_jobs(&mut self) {
        for id in self.table.ids() {
            if let Err(e) = self.kill_job(id) {
                tracing::warn!(job = %id, error = %e, "kill failed");
                self.reporter.error(&e.to_string());
            }
        }
    }

    /// Apply every pending child-state change and reap what finished.
    ///
    /// Call after each SIGCHLD notification. Safe to call spuriously.
    pub fn handle_child_events(&mut self) -> usize {
        reactor::drain(&mut self.table, &mut self.reporter)
    }

    /// Move whatever background jobs have written into their buffers.
    pub fn collect_output(&mut self) {
        for job in self.table.iter_mut() {
            let id = job.id();
            if let Some(capture) = job.capture_mut() {
                if let Err(e) = capture.pull() {
                    tracing::warn!(job = %id, error = %e, "reading capture failed");
                }
            }
        }
    }
}
