use std::path::Path;

use crate::errors::Result;

/// An opaque playable, seekable audio handle.
///
/// Positions and lengths are in the stream's own unit; only their ratio
/// matters to the engine. `position` and `length` may fail while the
/// underlying decoder has no metadata yet.
pub trait Stream: Send {
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn is_playing(&self) -> bool;
    fn position(&self) -> Result<u64>;
    fn set_position(&mut self, position: u64) -> Result<()>;
    fn length(&self) -> Result<u64>;
    /// Releases the underlying audio resources. The stream is not used afterwards.
    fn close(&mut self);
}

/// Opens streams for track sources.
///
/// The audio output primitive lives behind this trait.
pub trait StreamOpener: Send + Sync {
    fn open_url(&self, url: &str) -> Result<Box<dyn Stream>>;
    fn open_file(&self, path: &Path) -> Result<Box<dyn Stream>>;
}
