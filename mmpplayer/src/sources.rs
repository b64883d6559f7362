//! Named track capabilities shared by backends.

use std::sync::Arc;

use tracing::{debug, info};

use mmpcache::DownloadCache;

use crate::errors::{PlayerError, Result};
use crate::stream::{Stream, StreamOpener};
use crate::track::{Track, TrackSource};

/// Plays a remote URL directly.
pub struct UrlSource {
    url: String,
    opener: Arc<dyn StreamOpener>,
}

impl UrlSource {
    pub fn new(url: impl Into<String>, opener: Arc<dyn StreamOpener>) -> Self {
        Self {
            url: url.into(),
            opener,
        }
    }
}

impl TrackSource for UrlSource {
    fn get_stream(&self, _track: &Track) -> Result<Box<dyn Stream>> {
        debug!(url = %self.url, "opening url stream");
        self.opener.open_url(&self.url)
    }
}

/// Downloads the URL into a [`DownloadCache`], then plays the local file.
///
/// Runs inside a job: the download blocks the worker.
pub struct CachedSource {
    url: String,
    name: String,
    cache: DownloadCache,
    opener: Arc<dyn StreamOpener>,
}

impl CachedSource {
    pub fn new(
        url: impl Into<String>,
        name: impl Into<String>,
        cache: DownloadCache,
        opener: Arc<dyn StreamOpener>,
    ) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            cache,
            opener,
        }
    }
}

impl TrackSource for CachedSource {
    fn get_stream(&self, track: &Track) -> Result<Box<dyn Stream>> {
        let path = self.cache.download_file(&self.url, &self.name, false)?;
        info!(track = %track, path = %path.display(), "playing cached file");
        self.opener.open_file(&path)
    }
}

type AlbumLoader = dyn Fn(&Track) -> anyhow::Result<Vec<Track>> + Send + Sync;
type AlbumSink = dyn Fn(Vec<Track>) + Send + Sync;

/// A track standing for a list of tracks (album, playlist).
///
/// Activating it loads its children and hands them to `deliver`; it has
/// no stream of its own.
pub struct AlbumSource {
    load: Arc<AlbumLoader>,
    deliver: Arc<AlbumSink>,
}

impl AlbumSource {
    pub fn new<L, D>(load: L, deliver: D) -> Self
    where
        L: Fn(&Track) -> anyhow::Result<Vec<Track>> + Send + Sync + 'static,
        D: Fn(Vec<Track>) + Send + Sync + 'static,
    {
        Self {
            load: Arc::new(load),
            deliver: Arc::new(deliver),
        }
    }
}

impl TrackSource for AlbumSource {
    fn get_stream(&self, track: &Track) -> Result<Box<dyn Stream>> {
        Err(PlayerError::stream(format!("{} is not playable by itself", track)))
    }

    fn activate(&self, track: &Track) -> Result<()> {
        let tracks = (self.load)(track)?;
        debug!(album = %track, count = tracks.len(), "album expanded");
        (self.deliver)(tracks);
        Ok(())
    }
}
