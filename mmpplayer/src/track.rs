use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{PlayerError, Result};
use crate::stream::Stream;

/// What a track can do, per backend.
///
/// `activate` is the alternate action triggered when a track is chosen
/// (for instance expanding an album). Its default fails with
/// [`PlayerError::NotImplemented`], which tells the caller to play the
/// track through [`get_stream`](Self::get_stream) instead.
pub trait TrackSource: Send + Sync {
    fn get_stream(&self, track: &Track) -> Result<Box<dyn Stream>>;

    fn activate(&self, _track: &Track) -> Result<()> {
        Err(PlayerError::NotImplemented)
    }
}

/// A piece of playable metadata produced by a backend.
///
/// Immutable once built, except for its display index which is assigned
/// when the track is inserted into a results list.
#[derive(Clone)]
pub struct Track {
    artist: Option<String>,
    album: Option<String>,
    number: Option<u32>,
    title: String,
    metadata: BTreeMap<String, String>,
    index: Option<usize>,
    source: Arc<dyn TrackSource>,
}

impl Track {
    pub fn new(title: impl Into<String>, source: Arc<dyn TrackSource>) -> Self {
        Self {
            artist: None,
            album: None,
            number: None,
            title: title.into(),
            metadata: BTreeMap::new(),
            index: None,
            source,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_number(mut self, number: u32) -> Self {
        self.number = Some(number);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn number(&self) -> Option<u32> {
        self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = Some(index);
    }

    /// Artist and title, when both are known and non-empty.
    pub fn artist_title(&self) -> Option<(&str, &str)> {
        match self.artist.as_deref() {
            Some(artist) if !artist.is_empty() && !self.title.is_empty() => {
                Some((artist, self.title.as_str()))
            }
            _ => None,
        }
    }

    pub fn get_stream(&self) -> Result<Box<dyn Stream>> {
        self.source.get_stream(self)
    }

    pub fn activate(&self) -> Result<()> {
        self.source.activate(self)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.artist.as_deref() {
            Some(artist) if !artist.is_empty() => write!(f, "{} - {}", artist, self.title),
            _ => write!(f, "{}", self.title),
        }
    }
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("artist", &self.artist)
            .field("album", &self.album)
            .field("number", &self.number)
            .field("title", &self.title)
            .field("index", &self.index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl TrackSource for Silent {
        fn get_stream(&self, _track: &Track) -> Result<Box<dyn Stream>> {
            Err(PlayerError::stream("silent"))
        }
    }

    #[test]
    fn default_activate_is_not_implemented() {
        let track = Track::new("Drone Zone", Arc::new(Silent));
        assert!(matches!(track.activate(), Err(PlayerError::NotImplemented)));
    }

    #[test]
    fn display_uses_artist_when_known() {
        let track = Track::new("Hey Jude", Arc::new(Silent)).with_artist("The Beatles");
        assert_eq!(track.to_string(), "The Beatles - Hey Jude");
        assert_eq!(track.artist_title(), Some(("The Beatles", "Hey Jude")));

        let stream = Track::new("http://ice.somafm.com/groovesalad", Arc::new(Silent));
        assert_eq!(stream.to_string(), "http://ice.somafm.com/groovesalad");
        assert_eq!(stream.artist_title(), None);
    }
}
