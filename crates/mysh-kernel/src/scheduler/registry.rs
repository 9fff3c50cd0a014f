//! Job/process registry.
//!
//! The registry is an ordered `Vec` of jobs, each owning an ordered `Vec` of
//! processes. It is owned by the single-threaded main loop; the signal path
//! never touches it (see `reactor`). Lookups are linear scans, which is fine
//! for the handful of jobs an interactive shell carries.

use nix::unistd::Pid;

use super::capture::Capture;
use super::{ExecMode, JobId, JobInfo, ProcessInfo, ProcessStatus, StatusChange};
use crate::error::{JobError, JobResult};
use crate::parser::{Redirect, StageSpec};

/// One OS process within a job.
#[derive(Debug)]
pub struct Process {
    pid: Option<Pid>,
    argv: Vec<String>,
    input: Option<Redirect>,
    output: Option<Redirect>,
    status: ProcessStatus,
}

impl Process {
    /// Create a process from command text; the text is split into an
    /// argument vector on whitespace. Status starts as `New`.
    pub fn new(
        command: &str,
        input: Option<Redirect>,
        output: Option<Redirect>,
    ) -> JobResult<Self> {
        let argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        if argv.is_empty() {
            return Err(JobError::EmptyCommand);
        }
        Ok(Self {
            pid: None,
            argv,
            input,
            output,
            status: ProcessStatus::New,
        })
    }

    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// The full command line of this stage.
    pub fn command(&self) -> String {
        self.argv.join(" ")
    }

    pub fn input(&self) -> Option<&Redirect> {
        self.input.as_ref()
    }

    pub fn output(&self) -> Option<&Redirect> {
        self.output.as_ref()
    }

    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    pub(crate) fn set_pid(&mut self, pid: Pid) {
        self.pid = Some(pid);
    }

    pub(crate) fn mark_launched(&mut self) {
        self.status = self.status.on_launch();
    }

    pub(crate) fn mark_launch_failed(&mut self) {
        self.status = self.status.on_launch_failure();
    }

    /// The process can no longer be waited for; count it as gone.
    pub(crate) fn force_terminated(&mut self) {
        if !self.status.is_terminal() {
            self.status = ProcessStatus::Terminated;
        }
    }

    /// Apply an OS-reported change and return the new status.
    pub(crate) fn apply(&mut self, change: StatusChange) -> ProcessStatus {
        self.status = self.status.apply(change);
        self.status
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid.map(Pid::as_raw),
            status: self.status,
            argv: self.argv.clone(),
        }
    }
}

/// One pipeline submitted by the user.
#[derive(Debug, Default)]
pub struct Job {
    id: JobId,
    processes: Vec<Process>,
    pgid: Option<Pid>,
    mode: ExecMode,
    capture: Option<Capture>,
}

impl Job {
    /// An empty, unregistered job.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a job with one process per stage, in pipeline order.
    pub fn from_stages(stages: &[StageSpec]) -> JobResult<Self> {
        let mut job = Job::new();
        for stage in stages {
            job.append(Process::new(
                &stage.command,
                stage.input.clone(),
                stage.output.clone(),
            )?);
        }
        Ok(job)
    }

    /// Add a process at the end of the pipeline; it becomes `Ready`.
    pub fn append(&mut self, mut process: Process) {
        process.status = process.status.on_append();
        self.processes.push(process);
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub(crate) fn processes_mut(&mut self) -> &mut [Process] {
        &mut self.processes
    }

    /// Process group id; `None` until the first stage is forked.
    pub fn pgid(&self) -> Option<Pid> {
        self.pgid
    }

    /// Record the group from the first forked stage. Later calls are ignored.
    pub(crate) fn adopt_pgid(&mut self, pid: Pid) -> Pid {
        *self.pgid.get_or_insert(pid)
    }

    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    pub(crate) fn capture(&self) -> Option<&Capture> {
        self.capture.as_ref()
    }

    pub(crate) fn capture_mut(&mut self) -> Option<&mut Capture> {
        self.capture.as_mut()
    }

    pub(crate) fn attach_capture(&mut self, capture: Option<Capture>) {
        self.capture = capture;
    }

    pub(crate) fn process_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.processes.iter_mut().find(|p| p.pid == Some(pid))
    }

    /// Every process is Done, Terminated or Quit.
    pub fn is_completed(&self) -> bool {
        self.processes.iter().all(|p| p.status.is_terminal())
    }

    /// Every process is executing or finished; none is suspended.
    pub fn is_running(&self) -> bool {
        self.processes
            .iter()
            .all(|p| p.status.is_active() || p.status.is_terminal())
    }

    /// Every process is suspended or finished; none is executing.
    pub fn is_stopped(&self) -> bool {
        self.processes
            .iter()
            .all(|p| p.status.is_suspended() || p.status.is_terminal())
    }

    /// A foreground job with at least one executing process.
    pub fn is_foreground_active(&self) -> bool {
        self.mode == ExecMode::Foreground && self.processes.iter().any(|p| p.status.is_active())
    }

    /// Pipeline text, stages joined by ` | `.
    pub fn command(&self) -> String {
        self.processes
            .iter()
            .map(Process::command)
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn info(&self) -> JobInfo {
        JobInfo {
            id: self.id,
            pgid: self.pgid.map(Pid::as_raw),
            mode: self.mode,
            processes: self.processes.iter().map(Process::info).collect(),
        }
    }
}

/// Ordered collection of registered jobs.
#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    next_id: u64,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
        }
    }

    /// Link a job into the table and give it an id.
    ///
    /// Ids grow monotonically: the next id is one past the highest id ever
    /// handed out, so removing a job never frees its id for reuse.
    pub fn register(&mut self, mut job: Job, mode: ExecMode) -> JobId {
        let highest = self.jobs.iter().map(|j| j.id.0).max().unwrap_or(0);
        let id = JobId(self.next_id.max(highest + 1));
        self.next_id = id.0 + 1;

        job.id = id;
        job.mode = mode;
        self.jobs.push(job);
        id
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    /// The job owning the process with this pid.
    pub fn find_by_pid(&self, pid: Pid) -> Option<&Job> {
        self.jobs
            .iter()
            .find(|j| j.processes.iter().any(|p| p.pid == Some(pid)))
    }

    pub fn find_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        self.jobs
            .iter_mut()
            .find(|j| j.processes.iter().any(|p| p.pid == Some(pid)))
    }

    pub fn find_process_by_pid(&self, pid: Pid) -> Option<&Process> {
        self.find_by_pid(pid)
            .and_then(|j| j.processes.iter().find(|p| p.pid == Some(pid)))
    }

    /// Unlink a job. Dropping the returned value frees its processes and
    /// closes its capture pipes.
    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        let idx = self.jobs.iter().position(|j| j.id == id)?;
        Some(self.jobs.remove(idx))
    }

    pub fn any_foreground_active(&self) -> bool {
        self.jobs.iter().any(Job::is_foreground_active)
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|j| j.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TermSignal;

    fn job_of(commands: &[&str]) -> Job {
        let mut job = Job::new();
        for cmd in commands {
            job.append(Process::new(cmd, None, None).unwrap());
        }
        job
    }

    /// Give every process a fake pid and mark it launched.
    fn launched(mut job: Job, first_pid: i32) -> Job {
        for (i, p) in job.processes_mut().iter_mut().enumerate() {
            p.set_pid(Pid::from_raw(first_pid + i as i32));
            p.mark_launched();
        }
        job.adopt_pgid(Pid::from_raw(first_pid));
        job
    }

    #[test]
    fn test_process_new_splits_argv() {
        let p = Process::new("grep  -n   foo", None, None).unwrap();
        assert_eq!(p.argv(), ["grep", "-n", "foo"]);
        assert_eq!(p.status(), ProcessStatus::New);
        assert!(p.pid().is_none());
    }

    #[test]
    fn test_process_new_rejects_empty() {
        assert!(matches!(Process::new("   ", None, None), Err(JobError::EmptyCommand)));
    }

    #[test]
    fn test_append_marks_ready() {
        let job = job_of(&["ls", "wc"]);
        assert!(job.processes().iter().all(|p| p.status() == ProcessStatus::Ready));
        assert_eq!(job.command(), "ls | wc");
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut table = JobTable::new();
        assert_eq!(table.register(job_of(&["a"]), ExecMode::Foreground), JobId(1));
        assert_eq!(table.register(job_of(&["b"]), ExecMode::Background), JobId(2));
        assert_eq!(table.register(job_of(&["c"]), ExecMode::Background), JobId(3));
        assert_eq!(table.get(JobId(2)).unwrap().mode(), ExecMode::Background);
    }

    #[test]
    fn test_remove_does_not_renumber() {
        let mut table = JobTable::new();
        for cmd in ["a", "b", "c"] {
            table.register(job_of(&[cmd]), ExecMode::Background);
        }
        let removed = table.remove(JobId(2)).unwrap();
        assert_eq!(removed.command(), "b");

        assert_eq!(table.ids(), vec![JobId(1), JobId(3)]);
        assert_eq!(table.get(JobId(1)).unwrap().command(), "a");
        assert_eq!(table.get(JobId(3)).unwrap().command(), "c");
        assert!(table.get(JobId(2)).is_none());
    }

    #[test]
    fn test_ids_never_reused() {
        let mut table = JobTable::new();
        table.register(job_of(&["a"]), ExecMode::Background);
        table.register(job_of(&["b"]), ExecMode::Background);
        table.remove(JobId(2));
        assert_eq!(table.register(job_of(&["c"]), ExecMode::Background), JobId(3));

        table.remove(JobId(1));
        table.remove(JobId(3));
        assert!(table.is_empty());
        assert_eq!(table.register(job_of(&["d"]), ExecMode::Background), JobId(4));
    }

    #[test]
    fn test_find_by_pid() {
        let mut table = JobTable::new();
        table.register(launched(job_of(&["a"]), 100), ExecMode::Background);
        table.register(launched(job_of(&["b", "c"]), 200), ExecMode::Background);

        assert_eq!(table.find_by_pid(Pid::from_raw(201)).unwrap().id(), JobId(2));
        assert_eq!(
            table.find_process_by_pid(Pid::from_raw(201)).unwrap().argv(),
            ["c"]
        );
        assert!(table.find_by_pid(Pid::from_raw(999)).is_none());
        assert!(table.find_process_by_pid(Pid::from_raw(999)).is_none());
    }

    #[test]
    fn test_pgid_from_first_fork() {
        let mut job = job_of(&["a", "b"]);
        assert!(job.pgid().is_none());
        assert_eq!(job.adopt_pgid(Pid::from_raw(42)), Pid::from_raw(42));
        assert_eq!(job.adopt_pgid(Pid::from_raw(43)), Pid::from_raw(42));
    }

    #[test]
    fn test_completed_only_when_all_terminal() {
        let mut job = launched(job_of(&["a", "b", "c"]), 10);
        assert!(!job.is_completed());

        job.processes_mut()[0].apply(StatusChange::Exited(0));
        job.processes_mut()[1].apply(StatusChange::Signaled(TermSignal::Quit));
        assert!(!job.is_completed());

        job.processes_mut()[2].apply(StatusChange::Stopped);
        assert!(!job.is_completed());
        assert!(job.is_stopped());

        job.processes_mut()[2].apply(StatusChange::Continued);
        assert!(!job.is_completed());
        assert!(job.is_running());

        job.processes_mut()[2].apply(StatusChange::Signaled(TermSignal::Kill));
        assert!(job.is_completed());
    }

    #[test]
    fn test_running_and_stopped_predicates() {
        let mut job = launched(job_of(&["a", "b"]), 10);
        assert!(job.is_running());
        assert!(!job.is_stopped());

        job.processes_mut()[0].apply(StatusChange::Stopped);
        assert!(!job.is_running());
        assert!(!job.is_stopped());

        job.processes_mut()[1].apply(StatusChange::Stopped);
        assert!(job.is_stopped());
    }

    #[test]
    fn test_unlaunched_job_is_neither_running_nor_stopped() {
        let job = job_of(&["a"]);
        assert!(!job.is_running());
        assert!(!job.is_stopped());
        assert!(!job.is_completed());
    }

    #[test]
    fn test_launch_failure_completes_stage() {
        let mut job = job_of(&["cat"]);
        job.processes_mut()[0].mark_launch_failed();
        assert_eq!(job.processes()[0].status(), ProcessStatus::Terminated);
        assert!(job.is_completed());
    }

    #[test]
    fn test_foreground_active() {
        let mut table = JobTable::new();
        let id = table.register(launched(job_of(&["a"]), 10), ExecMode::Background);
        assert!(!table.any_foreground_active());
        table.remove(id);

        let id = table.register(launched(job_of(&["a"]), 20), ExecMode::Foreground);
        assert!(table.any_foreground_active());

        table
            .get_mut(id)
            .unwrap()
            .processes_mut()[0]
            .apply(StatusChange::Stopped);
        assert!(!table.any_foreground_active());
    }

    #[test]
    fn test_info_snapshot() {
        let mut table = JobTable::new();
        let id = table.register(launched(job_of(&["sleep 5"]), 77), ExecMode::Background);
        let info = table.get(id).unwrap().info();
        assert_eq!(info.id, id);
        assert_eq!(info.pgid, Some(77));
        assert_eq!(info.processes[0].pid, Some(77));
        assert_eq!(info.processes[0].status, ProcessStatus::Running);
        assert_eq!(info.command(), "sleep 5");
    }
}
