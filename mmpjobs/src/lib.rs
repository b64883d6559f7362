//! Cooperative job scheduler for MMP.
//!
//! All asynchronous work of the player (searches, downloads, playback
//! refresh, lyrics) is expressed as [`Job`]s submitted to a single
//! [`JobQueue`]. One dedicated worker thread pops jobs round-robin and
//! runs them to completion, one at a time:
//!
//!   - an action returning `Ok(true)` retires the job,
//!   - `Ok(false)` puts it back at the tail of the queue,
//!   - an error (or a panic) is reported once to the [`ErrorSink`] and the
//!     job is dropped.
//!
//! A job submitted with an interval is skipped (and requeued untouched)
//! until that interval has elapsed since the start of its previous run.
//!
//! Work that must reach the presentation layer goes through a
//! [`UiMarshal`], never through shared widgets.

mod clock;
mod job;
mod marshal;
mod queue;
mod sink;

pub use clock::{Clock, ManualClock, SystemClock};
pub use job::{Job, JobAction, JobHandle, JobInfo};
pub use marshal::{channel, ChannelMarshal, PresentationQueue, UiMarshal, UiTask};
pub use queue::{JobQueue, Step, WorkerHandle, DEFAULT_IDLE_POLL};
pub use sink::{ErrorSink, LogErrorSink, MarshalErrorSink};
