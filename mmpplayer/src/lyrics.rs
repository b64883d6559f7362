//! Lyrics follower: keeps a lyrics view in sync with the current track.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use mmpjobs::{JobHandle, JobQueue, UiMarshal};

use crate::engine::PlaybackEngine;
use crate::view::LyricsView;

pub const NOTHING_PLAYING: &str = "Nothing playing.";
pub const LYRICS_LOADING: &str = "Loading lyrics...";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lyrics {
    /// Where the lyrics were found.
    pub engine: String,
    pub text: String,
}

pub trait LyricsProvider: Send + Sync {
    /// `Ok(None)` when the provider has nothing for this track.
    fn get_lyrics(&self, artist: &str, title: &str) -> anyhow::Result<Option<Lyrics>>;
}

pub struct LyricsFollower {
    engine: PlaybackEngine,
    provider: Arc<dyn LyricsProvider>,
    view: Arc<dyn LyricsView>,
    marshal: Arc<dyn UiMarshal>,
    shown_for: Option<(String, String)>,
    cleared: bool,
}

impl LyricsFollower {
    pub fn new(
        engine: PlaybackEngine,
        provider: Arc<dyn LyricsProvider>,
        view: Arc<dyn LyricsView>,
        marshal: Arc<dyn UiMarshal>,
    ) -> Self {
        Self {
            engine,
            provider,
            view,
            marshal,
            shown_for: None,
            cleared: false,
        }
    }

    /// Checks the current track and refreshes the view when it changed.
    pub fn update(&mut self) {
        let current = self.engine.current().and_then(|track| {
            track
                .artist_title()
                .map(|(artist, title)| (artist.to_string(), title.to_string()))
        });

        let Some((artist, title)) = current else {
            self.shown_for = None;
            if !self.cleared {
                self.cleared = true;
                info!("lyrics cleared");
                self.publish(NOTHING_PLAYING.to_string());
            }
            return;
        };

        if self.shown_for.as_ref() == Some(&(artist.clone(), title.clone())) {
            return;
        }
        self.cleared = false;
        self.shown_for = Some((artist.clone(), title.clone()));

        self.publish(LYRICS_LOADING.to_string());
        info!(artist = %artist, title = %title, "loading lyrics");
        let text = match self.provider.get_lyrics(&artist, &title) {
            Ok(Some(lyrics)) => format!(
                "{} - {}\nFrom: {}\n\n{}",
                artist,
                title,
                lyrics.engine,
                lyrics.text.trim()
            ),
            Ok(None) => not_found(&artist, &title),
            Err(e) => {
                warn!(artist = %artist, title = %title, "lyrics lookup failed: {:#}", e);
                not_found(&artist, &title)
            }
        };
        self.publish(text);
    }

    fn publish(&self, text: String) {
        let view = self.view.clone();
        self.marshal
            .run_on_presentation_thread(Box::new(move || view.show_lyrics(text)));
    }

    /// Submits the follower as a periodic job. It never retires.
    pub fn install(mut self, queue: &JobQueue, interval: Duration) -> JobHandle {
        queue.submit(
            "Update Lyrics",
            move || {
                self.update();
                Ok(false)
            },
            Some(interval),
        )
    }
}

fn not_found(artist: &str, title: &str) -> String {
    format!("No lyrics found for {} - {}.", artist, title)
}
