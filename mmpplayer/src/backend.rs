use std::sync::Arc;

use tracing::{debug, info, warn};

use mmpjobs::{JobAction, JobHandle, JobQueue, UiMarshal};

use crate::errors::{PlayerError, Result};
use crate::track::Track;
use crate::view::ResultsView;

/// A source of tracks (a radio directory, a video site, direct URLs...).
///
/// `search` runs inside a job and may block.
pub trait Backend: Send + Sync {
    /// Stable identifier, also used as the backend's download directory.
    fn short_name(&self) -> &str;

    /// Human readable name.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn search(&self, query: &str) -> anyhow::Result<Vec<Track>>;

    /// Optional periodic action, submitted once when the backend is
    /// registered and run on every scheduler cycle.
    fn loop_job(&self) -> Option<JobAction> {
        None
    }
}

/// Registered backends, in registration order.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a backend and submits its loop job, if any.
    ///
    /// A second backend with an already registered short name is refused,
    /// and its loop job is not submitted.
    pub fn register(&mut self, queue: &JobQueue, backend: Arc<dyn Backend>) -> Result<Option<JobHandle>> {
        if self.get(backend.short_name()).is_some() {
            warn!(backend = backend.short_name(), "backend already registered");
            return Err(PlayerError::backend(format!(
                "a backend named {} is already registered",
                backend.short_name()
            )));
        }

        info!(backend = backend.short_name(), "registering backend");
        let handle = backend
            .loop_job()
            .map(|action| queue.submit(backend.name(), action, None));
        self.backends.push(backend);
        Ok(handle)
    }

    pub fn get(&self, short_name: &str) -> Option<Arc<dyn Backend>> {
        self.backends
            .iter()
            .find(|b| b.short_name() == short_name)
            .cloned()
    }

    pub fn short_names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.short_name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Backend>> {
        self.backends.iter()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// Submits a one-shot search job.
///
/// The results get their display index and are published to `view`
/// through the marshal. An empty result set is not published, the view
/// keeps its previous results.
pub fn submit_search(
    queue: &JobQueue,
    backend: Arc<dyn Backend>,
    query: impl Into<String>,
    view: Arc<dyn ResultsView>,
    marshal: Arc<dyn UiMarshal>,
) -> JobHandle {
    let query = query.into();
    debug!(backend = backend.short_name(), query = %query, "search requested");

    queue.submit_once(format!("Add results from {}", backend.name()), move || {
        let mut tracks = backend.search(&query)?;
        if tracks.is_empty() {
            debug!(backend = backend.short_name(), query = %query, "no results");
            return Ok(());
        }

        for (index, track) in tracks.iter_mut().enumerate() {
            track.set_index(index);
        }
        info!(backend = backend.short_name(), count = tracks.len(), "search results");

        let short_name = backend.short_name().to_string();
        marshal.run_on_presentation_thread(Box::new(move || view.show_results(&short_name, tracks)));
        Ok(())
    })
}
