#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mmpjobs::{ChannelMarshal, PresentationQueue};
use mmpplayer::{
    PlaybackEngine, PlayerError, PlayerView, PositionUpdate, Result, ResultsView, Stream,
    StreamOpener, Track, TrackSource,
};

/// État observable d'un faux stream
#[derive(Debug, Default)]
pub struct StreamState {
    pub playing: bool,
    pub position: u64,
    pub length: u64,
    pub closed: bool,
    pub pauses: usize,
    pub metadata_missing: bool,
}

pub type StreamHandle = Arc<Mutex<StreamState>>;

pub struct FakeStream(StreamHandle);

impl Stream for FakeStream {
    fn play(&mut self) -> Result<()> {
        self.0.lock().unwrap().playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut s = self.0.lock().unwrap();
        s.playing = false;
        s.pauses += 1;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.0.lock().unwrap().playing
    }

    fn position(&self) -> Result<u64> {
        let s = self.0.lock().unwrap();
        if s.metadata_missing {
            return Err(PlayerError::stream("no position yet"));
        }
        Ok(s.position)
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        self.0.lock().unwrap().position = position;
        Ok(())
    }

    fn length(&self) -> Result<u64> {
        let s = self.0.lock().unwrap();
        if s.metadata_missing {
            return Err(PlayerError::stream("no length yet"));
        }
        Ok(s.length)
    }

    fn close(&mut self) {
        let mut s = self.0.lock().unwrap();
        s.playing = false;
        s.closed = true;
    }
}

/// Fabrique de pistes : chaque ouverture crée un FakeStream observable
#[derive(Clone, Default)]
pub struct Deck {
    streams: Arc<Mutex<HashMap<String, StreamHandle>>>,
    opened: Arc<AtomicUsize>,
    broken: Arc<Mutex<Vec<String>>>,
}

impl Deck {
    pub fn track(&self, title: &str) -> Track {
        Track::new(title, Arc::new(self.clone())).with_artist("Artist")
    }

    /// Le dernier stream ouvert pour `title`
    pub fn stream(&self, title: &str) -> StreamHandle {
        self.streams.lock().unwrap()[title].clone()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn break_track(&self, title: &str) {
        self.broken.lock().unwrap().push(title.to_string());
    }

    fn open(&self, key: &str) -> Result<Box<dyn Stream>> {
        if self.broken.lock().unwrap().iter().any(|b| b == key) {
            return Err(PlayerError::stream(format!("{} is broken", key)));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let handle: StreamHandle = Arc::new(Mutex::new(StreamState {
            length: 1000,
            ..StreamState::default()
        }));
        self.streams
            .lock()
            .unwrap()
            .insert(key.to_string(), handle.clone());
        Ok(Box::new(FakeStream(handle)))
    }
}

impl TrackSource for Deck {
    fn get_stream(&self, track: &Track) -> Result<Box<dyn Stream>> {
        self.open(track.title())
    }
}

impl StreamOpener for Deck {
    fn open_url(&self, url: &str) -> Result<Box<dyn Stream>> {
        self.open(url)
    }

    fn open_file(&self, path: &Path) -> Result<Box<dyn Stream>> {
        self.open(&path.to_string_lossy())
    }
}

/// Vue qui garde tout ce qu'elle reçoit
#[derive(Default)]
pub struct RecordingView {
    pub positions: Mutex<Vec<PositionUpdate>>,
    pub results: Mutex<Vec<(String, Vec<Track>)>>,
    pub lyrics: Mutex<Vec<String>>,
}

impl RecordingView {
    pub fn last_position(&self) -> Option<PositionUpdate> {
        self.positions.lock().unwrap().last().cloned()
    }
}

impl PlayerView for RecordingView {
    fn show_position(&self, update: PositionUpdate) {
        self.positions.lock().unwrap().push(update);
    }
}

impl ResultsView for RecordingView {
    fn show_results(&self, backend: &str, tracks: Vec<Track>) {
        self.results
            .lock()
            .unwrap()
            .push((backend.to_string(), tracks));
    }
}

impl mmpplayer::LyricsView for RecordingView {
    fn show_lyrics(&self, text: String) {
        self.lyrics.lock().unwrap().push(text);
    }
}

pub struct Harness {
    pub deck: Deck,
    pub view: Arc<RecordingView>,
    pub marshal: ChannelMarshal,
    pub ui: PresentationQueue,
    pub engine: PlaybackEngine,
}

pub fn harness() -> Harness {
    let deck = Deck::default();
    let view = Arc::new(RecordingView::default());
    let (marshal, ui) = mmpjobs::channel();
    let engine = PlaybackEngine::new(view.clone(), Arc::new(marshal.clone()));
    Harness {
        deck,
        view,
        marshal,
        ui,
        engine,
    }
}

pub fn titles(tracks: &[Track]) -> Vec<String> {
    tracks.iter().map(|t| t.title().to_string()).collect()
}
