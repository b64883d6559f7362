//! The scheduler itself.
//!
//! Invariants:
//!   - at most one action runs at any time (single worker + step lock),
//!   - a job with an interval never starts twice within `interval`,
//!   - a failing action is reported once and never requeued.

use std::any::Any;
use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tracing::{debug, error, info, trace};

use crate::clock::{Clock, SystemClock};
use crate::job::{Job, JobHandle, JobInfo};
use crate::sink::ErrorSink;

/// How long the worker sleeps when nothing is eligible.
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(10);

/// Outcome of a single scheduler iteration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// The queue was empty.
    Idle,
    /// The head job was not due yet and went back to the tail.
    Deferred(JobHandle),
    /// The job ran and was requeued.
    Ran(JobHandle),
    /// The job ran and asked to be retired.
    Retired(JobHandle),
    /// The job failed and was dropped.
    Failed(JobHandle),
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    current: Option<JobInfo>,
}

struct Shared {
    state: Mutex<QueueState>,
    wakeup: Condvar,
    // Held for the whole of an iteration so that `run_once` can never
    // overlap with the worker.
    step: Mutex<()>,
    running: AtomicBool,
    next_id: AtomicU64,
}

/// Cooperative round-robin scheduler.
///
/// `JobQueue` is a cheap handle: clones share the same queue. Call
/// [`start`](Self::start) once to spawn the worker, [`stop`](Self::stop)
/// to ask it to exit.
#[derive(Clone)]
pub struct JobQueue {
    shared: Arc<Shared>,
    sink: Arc<dyn ErrorSink>,
    clock: Arc<dyn Clock>,
    idle_poll: Duration,
}

/// Join guard for the worker thread.
pub struct WorkerHandle {
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Waits for the worker to exit (after [`JobQueue::stop`]).
    pub fn join(self) -> thread::Result<()> {
        self.join.join()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl JobQueue {
    pub fn new(sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                wakeup: Condvar::new(),
                step: Mutex::new(()),
                running: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
            }),
            sink,
            clock: Arc::new(SystemClock),
            idle_poll: DEFAULT_IDLE_POLL,
        }
    }

    /// Replaces the time source. Meant to be called before any job runs.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_idle_poll(mut self, idle_poll: Duration) -> Self {
        self.idle_poll = idle_poll;
        self
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Adds a job at the tail of the queue.
    ///
    /// `interval = None` makes the job eligible on every cycle; otherwise
    /// it is skipped until `interval` has elapsed since its previous start.
    pub fn submit<F>(&self, name: impl Into<String>, action: F, interval: Option<Duration>) -> JobHandle
    where
        F: FnMut() -> anyhow::Result<bool> + Send + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let job = Job::new(id, name.into(), Box::new(action), interval);
        let handle = job.handle();
        debug!(job = %handle.name, id, ?interval, "job submitted");

        self.shared.state.lock().unwrap().jobs.push_back(job);
        self.shared.wakeup.notify_one();
        handle
    }

    /// Submits an action that runs once and then retires.
    pub fn submit_once<F>(&self, name: impl Into<String>, action: F) -> JobHandle
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let mut action = Some(action);
        self.submit(
            name,
            move || {
                if let Some(action) = action.take() {
                    action()?;
                }
                Ok(true)
            },
            None,
        )
    }

    /// True while the job is queued or running.
    pub fn contains(&self, handle: &JobHandle) -> bool {
        let state = self.shared.state.lock().unwrap();
        state.jobs.iter().any(|job| job.id() == handle.id)
            || state.current.as_ref().is_some_and(|job| job.id == handle.id)
    }

    /// Every queued job plus the one currently running.
    pub fn all_jobs(&self) -> Vec<JobInfo> {
        let state = self.shared.state.lock().unwrap();
        let mut jobs: Vec<JobInfo> = state.jobs.iter().map(|job| job.info(false)).collect();
        if let Some(current) = &state.current {
            jobs.push(current.clone());
        }
        jobs
    }

    /// Number of jobs waiting in the queue (the running one excluded).
    pub fn len(&self) -> usize {
        self.shared.state.lock().unwrap().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs one scheduler iteration as if the time were `now`.
    ///
    /// The worker calls this in a loop; tests call it directly to drive
    /// the queue deterministically.
    pub fn run_once(&self, now: Instant) -> Step {
        let _step = self.shared.step.lock().unwrap();

        let mut job = match self.shared.state.lock().unwrap().jobs.pop_front() {
            Some(job) => job,
            None => return Step::Idle,
        };
        let handle = job.handle();

        if !job.is_due(now) {
            trace!(job = %handle.name, "not due yet, requeued");
            self.shared.state.lock().unwrap().jobs.push_back(job);
            return Step::Deferred(handle);
        }

        self.shared.state.lock().unwrap().current = Some(job.info(true));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.run()));
        self.shared.state.lock().unwrap().current = None;

        let outcome = outcome.unwrap_or_else(|payload| Err(panic_error(payload)));
        match outcome {
            Ok(true) => {
                debug!(job = %handle.name, "job retired");
                Step::Retired(handle)
            }
            Ok(false) => {
                job.mark_run(now);
                self.shared.state.lock().unwrap().jobs.push_back(job);
                Step::Ran(handle)
            }
            Err(err) => {
                error!(job = %handle.name, "job failed: {:#}", err);
                self.sink.on_error(&handle.name, &err);
                Step::Failed(handle)
            }
        }
    }

    /// Spawns the worker thread.
    ///
    /// Fails if a worker is already running for this queue.
    pub fn start(&self) -> io::Result<WorkerHandle> {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "job worker already running",
            ));
        }

        let queue = self.clone();
        let spawned = thread::Builder::new()
            .name("mmp-jobs".to_string())
            .spawn(move || queue.worker_loop());

        match spawned {
            Ok(join) => Ok(WorkerHandle { join }),
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Asks the worker to exit once the current action returns.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.wakeup.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    fn worker_loop(&self) {
        info!("job worker started");
        let mut deferred_in_a_row = 0usize;

        while self.is_running() {
            match self.run_once(self.clock.now()) {
                Step::Idle => {
                    deferred_in_a_row = 0;
                    self.wait(true);
                }
                Step::Deferred(_) => {
                    // A full lap without anything due: sleep instead of spinning.
                    deferred_in_a_row += 1;
                    if deferred_in_a_row >= self.len() {
                        deferred_in_a_row = 0;
                        self.wait(false);
                    }
                }
                _ => deferred_in_a_row = 0,
            }
        }

        info!("job worker stopped");
    }

    fn wait(&self, only_if_empty: bool) {
        let state = self.shared.state.lock().unwrap();
        if only_if_empty && !state.jobs.is_empty() {
            return;
        }
        if !self.is_running() {
            return;
        }
        let _ = self.shared.wakeup.wait_timeout(state, self.idle_poll);
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    anyhow!("job panicked: {}", message)
}
