//! Player core of MMP: what plays, what comes next, and where tracks
//! come from.
//!
//! Backends produce [`Track`]s; each track carries a [`TrackSource`]
//! capability that opens a [`Stream`] (or, for albums, expands into more
//! tracks). The [`PlaybackEngine`] sequences streams and is advanced by a
//! periodic job on the [`mmpjobs::JobQueue`]; every presentation update
//! goes through a [`mmpjobs::UiMarshal`].

pub mod app;
pub mod backend;
pub mod engine;
pub mod errors;
pub mod format;
pub mod lyrics;
pub mod sources;
pub mod stream;
pub mod track;
pub mod view;

pub use app::Player;
pub use backend::{submit_search, Backend, BackendRegistry};
pub use engine::{PlaybackEngine, TICK_JOB_NAME};
pub use errors::{PlayerError, Result};
pub use format::{english_list, format_duration, format_track, pluralise};
pub use lyrics::{Lyrics, LyricsFollower, LyricsProvider};
pub use sources::{AlbumSource, CachedSource, UrlSource};
pub use stream::{Stream, StreamOpener};
pub use track::{Track, TrackSource};
pub use view::{LyricsView, PlayerView, PositionUpdate, ResultsView};

/// Application name, shown as the title while nothing plays.
pub const APP_NAME: &str = "MMP";
