use std::fmt;
use std::time::{Duration, Instant};

/// The body of a job.
///
/// Returns `Ok(true)` to retire the job, `Ok(false)` to be run again.
pub type JobAction = Box<dyn FnMut() -> anyhow::Result<bool> + Send>;

/// A named, repeatable unit of work owned by the [`JobQueue`](crate::JobQueue).
pub struct Job {
    id: u64,
    name: String,
    action: JobAction,
    interval: Option<Duration>,
    last_run: Option<Instant>,
}

impl Job {
    pub(crate) fn new(
        id: u64,
        name: String,
        action: JobAction,
        interval: Option<Duration>,
    ) -> Self {
        Self {
            id,
            name,
            action,
            interval,
            last_run: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Start time of the last completed run, `None` if it never ran.
    pub fn last_run(&self) -> Option<Instant> {
        self.last_run
    }

    /// True when the job may run at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match (self.interval, self.last_run) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    pub(crate) fn run(&mut self) -> anyhow::Result<bool> {
        (self.action)()
    }

    pub(crate) fn mark_run(&mut self, started: Instant) {
        self.last_run = Some(started);
    }

    pub fn handle(&self) -> JobHandle {
        JobHandle {
            id: self.id,
            name: self.name.clone(),
        }
    }

    pub(crate) fn info(&self, running: bool) -> JobInfo {
        JobInfo {
            id: self.id,
            name: self.name.clone(),
            interval: self.interval,
            last_run: self.last_run,
            running,
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("last_run", &self.last_run)
            .finish_non_exhaustive()
    }
}

/// Returned by [`JobQueue::submit`](crate::JobQueue::submit).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub id: u64,
    pub name: String,
}

/// Snapshot of a job for diagnostics.
#[derive(Clone, Debug)]
pub struct JobInfo {
    pub id: u64,
    pub name: String,
    pub interval: Option<Duration>,
    pub last_run: Option<Instant>,
    /// True for the job the worker is executing right now.
    pub running: bool,
}
