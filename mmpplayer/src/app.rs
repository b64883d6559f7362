//! Wiring of the player core from the configuration.

use std::io;
use std::sync::Arc;

use tracing::info;

use mmpcache::{CacheConfigExt, DownloadCache};
use mmpconfig::Config;
use mmpjobs::{ErrorSink, JobHandle, JobQueue, UiMarshal, WorkerHandle};

use crate::backend::{submit_search, Backend, BackendRegistry};
use crate::engine::PlaybackEngine;
use crate::errors::{PlayerError, Result};
use crate::format::format_track;
use crate::lyrics::{LyricsFollower, LyricsProvider};
use crate::track::Track;
use crate::view::{LyricsView, PlayerView, ResultsView};

/// The job queue, the playback engine, the download cache and the
/// backends, built from one [`Config`].
pub struct Player {
    config: Arc<Config>,
    queue: JobQueue,
    engine: PlaybackEngine,
    cache: DownloadCache,
    backends: BackendRegistry,
    marshal: Arc<dyn UiMarshal>,
    tick: JobHandle,
}

impl Player {
    /// Builds the core and submits the tick job. The worker is not started.
    pub fn from_config(
        config: Arc<Config>,
        view: Arc<dyn PlayerView>,
        marshal: Arc<dyn UiMarshal>,
        sink: Arc<dyn ErrorSink>,
    ) -> anyhow::Result<Self> {
        let queue = JobQueue::new(sink).with_idle_poll(config.get_idle_poll()?);
        let cache = config.create_download_cache()?;
        let engine = PlaybackEngine::new(view, marshal.clone());
        let tick = engine.install(&queue, config.get_refresh_interval()?);

        info!(
            files = %cache.root().display(),
            max_files = cache.max_files(),
            "player core ready"
        );

        Ok(Self {
            config,
            queue,
            engine,
            cache,
            backends: BackendRegistry::new(),
            marshal,
            tick,
        })
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn cache(&self) -> &DownloadCache {
        &self.cache
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    pub fn tick_job(&self) -> &JobHandle {
        &self.tick
    }

    pub fn start(&self) -> io::Result<WorkerHandle> {
        self.queue.start()
    }

    pub fn stop(&self) {
        self.queue.stop();
    }

    /// Registers a backend and submits its loop job, if any.
    pub fn add_backend(&mut self, backend: Arc<dyn Backend>) -> Result<Option<JobHandle>> {
        self.backends.register(&self.queue, backend)
    }

    /// Download cache view dedicated to `backend` (`<files>/<short_name>`).
    pub fn backend_cache(&self, backend: &dyn Backend) -> Result<DownloadCache> {
        Ok(self.cache.namespace(backend.short_name())?)
    }

    /// Submits a search on the backend named `short_name`.
    pub fn search(
        &self,
        short_name: &str,
        query: &str,
        view: Arc<dyn ResultsView>,
    ) -> Result<JobHandle> {
        let backend = self
            .backends
            .get(short_name)
            .ok_or_else(|| PlayerError::backend(format!("unknown backend {}", short_name)))?;
        Ok(submit_search(&self.queue, backend, query, view, self.marshal.clone()))
    }

    /// Remembers `short_name` as the last backend shown.
    pub fn select_backend(&self, short_name: &str) -> Result<()> {
        if self.backends.get(short_name).is_none() {
            return Err(PlayerError::backend(format!("unknown backend {}", short_name)));
        }
        self.config.set_last_backend(short_name.to_string())?;
        Ok(())
    }

    /// The last backend shown, if it is still registered.
    pub fn last_backend(&self) -> Option<Arc<dyn Backend>> {
        let name = self.config.get_last_backend().ok()?;
        self.backends.get(&name)
    }

    /// Result line for `track` with the configured template.
    pub fn format_result(&self, track: &Track) -> String {
        let template = self
            .config
            .get_track_format()
            .unwrap_or_else(|_| mmpconfig::DEFAULT_TRACK_FORMAT.to_string());
        format_track(&template, track)
    }

    /// Starts following the current track's lyrics.
    pub fn follow_lyrics(
        &self,
        provider: Arc<dyn LyricsProvider>,
        view: Arc<dyn LyricsView>,
    ) -> anyhow::Result<JobHandle> {
        let interval = self.config.get_lyrics_interval()?;
        let follower = LyricsFollower::new(self.engine.clone(), provider, view, self.marshal.clone());
        Ok(follower.install(&self.queue, interval))
    }
}
