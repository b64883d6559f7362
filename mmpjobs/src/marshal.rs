//! Boundary between the job worker and the presentation thread.

use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::debug;

/// A unit of work to run on the presentation thread.
pub type UiTask = Box<dyn FnOnce() + Send>;

/// "Run this on the presentation thread".
///
/// Job actions never touch presentation state directly; they hand a
/// closure to the marshal instead.
pub trait UiMarshal: Send + Sync {
    fn run_on_presentation_thread(&self, task: UiTask);
}

/// Sending half of a presentation channel.
#[derive(Clone)]
pub struct ChannelMarshal {
    tx: Sender<UiTask>,
}

/// Receiving half of a presentation channel, owned by the presentation thread.
pub struct PresentationQueue {
    rx: Receiver<UiTask>,
}

/// Creates a connected marshal / presentation queue pair.
pub fn channel() -> (ChannelMarshal, PresentationQueue) {
    let (tx, rx) = unbounded::<UiTask>();
    (ChannelMarshal { tx }, PresentationQueue { rx })
}

impl UiMarshal for ChannelMarshal {
    fn run_on_presentation_thread(&self, task: UiTask) {
        if self.tx.send(task).is_err() {
            debug!("presentation queue closed, dropping UI task");
        }
    }
}

impl PresentationQueue {
    /// Runs every task already queued. Returns how many ran.
    pub fn drain(&self) -> usize {
        let mut count = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            count += 1;
        }
        count
    }

    /// Runs tasks as they arrive until `timeout` has elapsed.
    pub fn run_for(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut count = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(task) => {
                    task();
                    count += 1;
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        count
    }

    /// Number of tasks waiting.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
