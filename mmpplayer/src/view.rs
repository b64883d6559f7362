//! Presentation-side collaborators.
//!
//! Implementations are only ever called on the presentation thread,
//! through a [`mmpjobs::UiMarshal`].

use crate::track::Track;

/// What the position indicator and the window title show.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionUpdate {
    /// 0 to 100
    pub percent: f64,
    pub title: String,
}

pub trait PlayerView: Send + Sync {
    fn show_position(&self, update: PositionUpdate);
}

pub trait ResultsView: Send + Sync {
    /// Replaces the results shown for `backend` (a backend short name).
    fn show_results(&self, backend: &str, tracks: Vec<Track>);
}

pub trait LyricsView: Send + Sync {
    fn show_lyrics(&self, text: String);
}
