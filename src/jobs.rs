//! Background job table.
//!
//! Every command started with a trailing `&` is recorded here together with
//! its child handle. Status moves `Running <-> Stopped` on explicit signals and
//! to `Done` once a poll observes the child has terminated. Entries are never
//! dropped implicitly; [`JobTable::evict_done`] is the only way out.

use crate::command::ExitCode;
use crate::error::ShellError;
use crate::launcher::exit_code;
use log::{info, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::fmt;
use std::process::Child;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Stopped,
    Done,
}

impl JobStatus {
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Running => "Running",
            JobStatus::Stopped => "Stopped",
            JobStatus::Done => "Done",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A child process started in the background.
#[derive(Debug)]
pub struct BackgroundJob {
    pid: u32,
    label: String,
    status: JobStatus,
    exit_code: Option<ExitCode>,
    child: Child,
}

impl BackgroundJob {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Program name the job was started with.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Exit code, known once the job is `Done`.
    pub fn exit_code(&self) -> Option<ExitCode> {
        self.exit_code
    }

    fn finish(&mut self, code: ExitCode) {
        self.status = JobStatus::Done;
        self.exit_code = Some(code);
        info!("job {} ({}) done with status {code}", self.pid, self.label);
    }
}

impl fmt::Display for BackgroundJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} - {}", self.pid, self.label, self.status)
    }
}

/// Background jobs keyed by process id, listed in the order they were started.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: HashMap<u32, BackgroundJob>,
    order: Vec<u32>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly spawned child as a running job and return its pid.
    pub fn insert(&mut self, child: Child, label: impl Into<String>) -> u32 {
        let pid = child.id();
        let job = BackgroundJob {
            pid,
            label: label.into(),
            status: JobStatus::Running,
            exit_code: None,
            child,
        };
        info!("job {pid} ({}) started in background", job.label);
        if self.jobs.insert(pid, job).is_none() {
            self.order.push(pid);
        }
        pid
    }

    pub fn get(&self, pid: u32) -> Option<&BackgroundJob> {
        self.jobs.get(&pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackgroundJob> {
        self.order.iter().filter_map(|pid| self.jobs.get(pid))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Check every unfinished job without blocking and mark terminated ones `Done`.
    pub fn poll(&mut self) {
        for job in self.jobs.values_mut() {
            if job.status == JobStatus::Done {
                continue;
            }
            match job.child.try_wait() {
                Ok(Some(status)) => job.finish(exit_code(status)),
                Ok(None) => {}
                Err(e) => warn!("polling job {} failed: {e}", job.pid),
            }
        }
    }

    /// Send SIGSTOP; a tracked job is marked `Stopped` once the signal is delivered.
    pub fn stop(&mut self, pid: u32) -> Result<(), ShellError> {
        self.signal(pid, Signal::SIGSTOP)?;
        self.set_status(pid, JobStatus::Stopped);
        Ok(())
    }

    /// Send SIGCONT; a tracked job is marked `Running` once the signal is delivered.
    pub fn resume(&mut self, pid: u32) -> Result<(), ShellError> {
        self.signal(pid, Signal::SIGCONT)?;
        self.set_status(pid, JobStatus::Running);
        Ok(())
    }

    /// Resume a tracked job and block until it terminates.
    pub fn foreground(&mut self, pid: u32) -> Result<ExitCode, ShellError> {
        let Some(job) = self.jobs.get(&pid) else {
            return Err(ShellError::NoSuchJob { pid });
        };
        if let Some(code) = job.exit_code {
            return Ok(code);
        }
        self.resume(pid)?;
        let job = self
            .jobs
            .get_mut(&pid)
            .ok_or(ShellError::NoSuchJob { pid })?;
        let status = job
            .child
            .wait()
            .map_err(|source| ShellError::WaitFailed { pid, source })?;
        let code = exit_code(status);
        job.finish(code);
        Ok(code)
    }

    /// Deliver `signal` to `pid`; `None` only checks that the process exists.
    /// The table is left as is; a terminated job is picked up by the next
    /// [`poll`](Self::poll).
    ///
    /// A tracked job that is already `Done` has been reaped and its pid may be
    /// reused, so it is never signalled.
    pub fn signal(&self, pid: u32, signal: impl Into<Option<Signal>>) -> Result<(), ShellError> {
        let signal = signal.into();
        let name = signal.map_or("0", Signal::as_str);
        let target = nix_pid(pid)?;
        let delivered = match self.jobs.get(&pid) {
            Some(job) if job.status == JobStatus::Done => Err(Errno::ESRCH),
            _ => signal::kill(target, signal),
        };
        delivered.map_err(|errno| {
            warn!("{name} to {pid} failed: {errno}");
            ShellError::SignalDeliveryFailed {
                pid,
                signal: name.to_string(),
                errno,
            }
        })?;
        info!("sent {name} to {pid}");
        Ok(())
    }

    /// Remove every `Done` job and return how many were removed.
    pub fn evict_done(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| job.status != JobStatus::Done);
        let jobs = &self.jobs;
        self.order.retain(|pid| jobs.contains_key(pid));
        before - self.jobs.len()
    }

    fn set_status(&mut self, pid: u32, status: JobStatus) {
        if let Some(job) = self.jobs.get_mut(&pid) {
            if job.status != JobStatus::Done {
                job.status = status;
            }
        }
    }
}

/// Only positive pids address a single process; 0 and negatives would signal groups.
fn nix_pid(pid: u32) -> Result<Pid, ShellError> {
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => Ok(Pid::from_raw(raw)),
        _ => Err(ShellError::InvalidPid {
            value: pid.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};
    use std::thread;
    use std::time::{Duration, Instant};

    fn spawn(program: &str, args: &[&str]) -> Child {
        Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .spawn()
            .expect("spawn test child")
    }

    /// Poll until the job is done or a few seconds have passed.
    fn poll_until_done(table: &mut JobTable, pid: u32) -> JobStatus {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            table.poll();
            let status = table.get(pid).unwrap().status();
            if status == JobStatus::Done || Instant::now() > deadline {
                return status;
            }
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn new_job_is_running() {
        let mut table = JobTable::new();
        let pid = table.insert(spawn("sleep", &["5"]), "sleep");
        assert_eq!(table.get(pid).unwrap().status(), JobStatus::Running);
        assert_eq!(table.get(pid).unwrap().label(), "sleep");
        table.signal(pid, Signal::SIGKILL).unwrap();
        assert_eq!(poll_until_done(&mut table, pid), JobStatus::Done);
    }

    #[test]
    fn finished_job_becomes_done_after_poll() {
        let mut table = JobTable::new();
        let pid = table.insert(spawn("sleep", &["0.2"]), "sleep");
        assert_eq!(table.get(pid).unwrap().status(), JobStatus::Running);
        assert_eq!(poll_until_done(&mut table, pid), JobStatus::Done);
        assert_eq!(table.get(pid).unwrap().exit_code(), Some(0));
        // still listed until explicitly evicted
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn stop_and_resume_toggle_status() {
        let mut table = JobTable::new();
        let pid = table.insert(spawn("sleep", &["5"]), "sleep");

        table.stop(pid).unwrap();
        assert_eq!(table.get(pid).unwrap().status(), JobStatus::Stopped);
        table.poll();
        assert_eq!(table.get(pid).unwrap().status(), JobStatus::Stopped);

        table.resume(pid).unwrap();
        assert_eq!(table.get(pid).unwrap().status(), JobStatus::Running);

        table.signal(pid, Signal::SIGTERM).unwrap();
        assert_eq!(poll_until_done(&mut table, pid), JobStatus::Done);
        assert_eq!(table.get(pid).unwrap().exit_code(), Some(128 + 15));
    }

    #[test]
    fn foreground_waits_for_completion() {
        let mut table = JobTable::new();
        let pid = table.insert(spawn("sh", &["-c", "sleep 0.2; exit 3"]), "sh");
        table.stop(pid).unwrap();
        assert_eq!(table.foreground(pid).unwrap(), 3);
        assert_eq!(table.get(pid).unwrap().status(), JobStatus::Done);
        // asking again returns the recorded status
        assert_eq!(table.foreground(pid).unwrap(), 3);
    }

    #[test]
    fn foreground_of_unknown_pid_fails() {
        let mut table = JobTable::new();
        assert!(matches!(
            table.foreground(999_999),
            Err(ShellError::NoSuchJob { pid: 999_999 })
        ));
    }

    #[test]
    fn signal_to_vanished_process_leaves_entry() {
        let mut table = JobTable::new();
        let pid = table.insert(spawn("true", &[]), "true");
        assert_eq!(poll_until_done(&mut table, pid), JobStatus::Done);

        // the child has been reaped, so the pid no longer names a process
        let err = table.stop(pid).unwrap_err();
        assert!(matches!(err, ShellError::SignalDeliveryFailed { .. }));
        assert_eq!(table.get(pid).unwrap().status(), JobStatus::Done);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn finished_jobs_are_not_signalled() {
        let mut table = JobTable::new();
        let pid = table.insert(spawn("true", &[]), "true");
        assert_eq!(poll_until_done(&mut table, pid), JobStatus::Done);

        for result in [table.stop(pid), table.resume(pid), table.signal(pid, None)] {
            assert!(matches!(
                result,
                Err(ShellError::SignalDeliveryFailed {
                    errno: Errno::ESRCH,
                    ..
                })
            ));
        }
        assert_eq!(table.get(pid).unwrap().status(), JobStatus::Done);
    }

    #[test]
    fn null_signal_checks_a_live_job() {
        let mut table = JobTable::new();
        let pid = table.insert(spawn("sleep", &["5"]), "sleep");
        table.signal(pid, None).unwrap();
        table.poll();
        assert_eq!(table.get(pid).unwrap().status(), JobStatus::Running);
        table.signal(pid, Signal::SIGKILL).unwrap();
        assert_eq!(poll_until_done(&mut table, pid), JobStatus::Done);
    }

    #[test]
    fn invalid_pids_are_rejected_before_signalling() {
        let table = JobTable::new();
        assert!(matches!(
            table.signal(0, Signal::SIGTERM),
            Err(ShellError::InvalidPid { .. })
        ));
        assert!(matches!(
            table.signal(u32::MAX, Signal::SIGTERM),
            Err(ShellError::InvalidPid { .. })
        ));
    }

    #[test]
    fn listing_keeps_start_order() {
        let mut table = JobTable::new();
        let first = table.insert(spawn("sleep", &["5"]), "first");
        let second = table.insert(spawn("sleep", &["5"]), "second");
        let labels: Vec<_> = table.iter().map(|j| j.label().to_string()).collect();
        assert_eq!(labels, ["first", "second"]);
        for pid in [first, second] {
            table.signal(pid, Signal::SIGKILL).unwrap();
            poll_until_done(&mut table, pid);
        }
    }

    #[test]
    fn evict_done_is_idempotent() {
        let mut table = JobTable::new();
        let done = table.insert(spawn("true", &[]), "true");
        let running = table.insert(spawn("sleep", &["5"]), "sleep");
        poll_until_done(&mut table, done);

        assert_eq!(table.evict_done(), 1);
        assert_eq!(table.evict_done(), 0);
        assert_eq!(table.len(), 1);
        assert!(table.get(running).is_some());
        assert_eq!(table.iter().count(), 1);

        table.signal(running, Signal::SIGKILL).unwrap();
        poll_until_done(&mut table, running);
    }

    #[test]
    fn display_matches_listing_format() {
        let mut table = JobTable::new();
        let pid = table.insert(spawn("sleep", &["5"]), "sleep");
        assert_eq!(
            table.get(pid).unwrap().to_string(),
            format!("[{pid}] sleep - Running")
        );
        table.signal(pid, Signal::SIGKILL).unwrap();
        poll_until_done(&mut table, pid);
    }
}
