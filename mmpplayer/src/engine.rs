//! Playback sequencing: current track, play queue, play history.
//!
//! Every method is meant to run inside a job action on the job worker.
//! Presentation state only changes through the marshal.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use mmpjobs::{JobHandle, JobQueue, UiMarshal};

use crate::errors::{PlayerError, Result};
use crate::stream::Stream;
use crate::track::Track;
use crate::view::{PlayerView, PositionUpdate};

/// Name of the tick job submitted by [`PlaybackEngine::install`].
pub const TICK_JOB_NAME: &str = "Play Manager";

struct Playing {
    track: Track,
    stream: Box<dyn Stream>,
}

#[derive(Default)]
struct EngineState {
    current: Option<Playing>,
    history: Vec<Track>,
    queue: VecDeque<Track>,
}

/// Owns what is playing, what was played and what comes next.
///
/// Cheap to clone: clones share the same state.
#[derive(Clone)]
pub struct PlaybackEngine {
    state: Arc<Mutex<EngineState>>,
    view: Arc<dyn PlayerView>,
    marshal: Arc<dyn UiMarshal>,
    app_name: Arc<str>,
}

impl PlaybackEngine {
    pub fn new(view: Arc<dyn PlayerView>, marshal: Arc<dyn UiMarshal>) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::default())),
            view,
            marshal,
            app_name: Arc::from(crate::APP_NAME),
        }
    }

    /// Title shown while nothing is playing.
    pub fn with_app_name(mut self, name: &str) -> Self {
        self.app_name = Arc::from(name);
        self
    }

    // ---- Inspection ----

    pub fn current(&self) -> Option<Track> {
        let state = self.state.lock().unwrap();
        state.current.as_ref().map(|p| p.track.clone())
    }

    pub fn history(&self) -> Vec<Track> {
        self.state.lock().unwrap().history.clone()
    }

    pub fn queue(&self) -> Vec<Track> {
        self.state.lock().unwrap().queue.iter().cloned().collect()
    }

    pub fn is_idle(&self) -> bool {
        self.state.lock().unwrap().current.is_none()
    }

    pub fn is_playing(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.current.as_ref().is_some_and(|p| p.stream.is_playing())
    }

    // ---- Transitions ----

    /// Plays `track`, replacing the current one.
    ///
    /// The stream is opened before anything changes: if that fails the
    /// engine is left as it was. When `mark_played` is set the replaced
    /// track is appended to the history.
    pub fn play(&self, track: Track, mark_played: bool) -> Result<()> {
        let stream = track.get_stream()?;
        self.install_stream(track, stream, mark_played)
    }

    fn install_stream(&self, track: Track, stream: Box<dyn Stream>, mark_played: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(old) = state.current.take() {
            retire(&mut state, old, mark_played);
        }

        info!(track = %track, "playing");
        let playing = state.current.insert(Playing { track, stream });
        playing.stream.play()
    }

    /// Plays the head of the queue.
    pub fn next(&self) -> Result<()> {
        let track = self.state.lock().unwrap().queue.pop_front();
        match track {
            Some(track) => self.play(track, true),
            None => Err(PlayerError::NothingToPlay),
        }
    }

    /// Replays the last track of the history.
    ///
    /// The current track goes to the front of the queue so that a later
    /// [`next`](Self::next) comes back to it. The replayed track is not
    /// recorded again.
    pub fn previous(&self) -> Result<()> {
        let track = match self.state.lock().unwrap().history.pop() {
            Some(track) => track,
            None => return Err(PlayerError::NothingToPlay),
        };

        let stream = match track.get_stream() {
            Ok(stream) => stream,
            Err(e) => {
                // On remet la piste dans l'historique
                self.state.lock().unwrap().history.push(track);
                return Err(e);
            }
        };

        {
            let mut state = self.state.lock().unwrap();
            if let Some(current) = state.current.as_ref() {
                let current = current.track.clone();
                state.queue.push_front(current);
            }
        }
        self.install_stream(track, stream, false)
    }

    /// Toggles pause on the current stream.
    pub fn play_pause(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let playing = state.current.as_mut().ok_or(PlayerError::NothingToPlay)?;
        if playing.stream.is_playing() {
            debug!(track = %playing.track, "pause");
            playing.stream.pause()
        } else {
            debug!(track = %playing.track, "resume");
            playing.stream.play()
        }
    }

    /// Stops playback and goes idle. The stopped track is recorded.
    pub fn stop(&self) {
        self.clear_current();
        self.publish(self.idle_update());
    }

    pub fn enqueue(&self, track: Track) {
        debug!(track = %track, "queued");
        self.state.lock().unwrap().queue.push_back(track);
    }

    /// Runs the track's alternate action, or plays it when it has none.
    pub fn activate(&self, track: Track) -> Result<()> {
        match track.activate() {
            Err(PlayerError::NotImplemented) => self.play(track, true),
            other => other,
        }
    }

    /// Seeks to `value` percent (or by `value` percent when `relative`).
    ///
    /// While idle the indicator is reset to 0.
    pub fn set_position(&self, value: f64, relative: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let playing = match state.current.as_mut() {
            Some(playing) => playing,
            None => {
                drop(state);
                self.publish(self.idle_update());
                return Ok(());
            }
        };

        let length = playing.stream.length().unwrap_or(0);
        let mut value = value;
        if relative {
            value += percent_of(playing.stream.position().unwrap_or(0), length);
        }
        let value = value.clamp(0.0, 100.0);

        // Sans longueur connue, on ne déplace pas le flux
        if length > 0 {
            let offset = (length.saturating_sub(1) as f64 * value / 100.0).round() as u64;
            playing.stream.set_position(offset)?;
        } else {
            debug!(percent = value, "stream length unknown, seek skipped");
        }

        let update = PositionUpdate {
            percent: value,
            title: playing.track.to_string(),
        };
        drop(state);
        self.publish(update);
        Ok(())
    }

    /// One refresh of the playback state.
    ///
    /// Publishes the position and title, and moves on to the next queued
    /// track once the current one has finished. A length or position of 0
    /// means the metadata is not there yet, never that the track ended.
    pub fn tick(&self) -> Result<()> {
        let (update, finished) = {
            let state = self.state.lock().unwrap();
            match state.current.as_ref() {
                None => (self.idle_update(), false),
                Some(playing) => {
                    let length = playing.stream.length().unwrap_or(0);
                    let position = playing.stream.position().unwrap_or(0);
                    let update = PositionUpdate {
                        percent: percent_of(position, length),
                        title: playing.track.to_string(),
                    };
                    (update, length > 0 && position > 0 && position >= length)
                }
            }
        };

        self.publish(update);
        if finished {
            self.advance()?;
        }
        Ok(())
    }

    fn advance(&self) -> Result<()> {
        let next = self.state.lock().unwrap().queue.pop_front();
        match next {
            Some(track) => {
                if let Err(e) = self.play(track, true) {
                    // La piste terminée ne doit pas être rejouée en boucle
                    self.clear_current();
                    return Err(e);
                }
                Ok(())
            }
            None => {
                info!("queue exhausted, going idle");
                self.clear_current();
                Ok(())
            }
        }
    }

    fn clear_current(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(old) = state.current.take() {
            retire(&mut state, old, true);
        }
    }

    fn idle_update(&self) -> PositionUpdate {
        PositionUpdate {
            percent: 0.0,
            title: self.app_name.to_string(),
        }
    }

    fn publish(&self, update: PositionUpdate) {
        let view = self.view.clone();
        self.marshal
            .run_on_presentation_thread(Box::new(move || view.show_position(update)));
    }

    // ---- Jobs ----

    /// Submits the tick job. It never retires.
    ///
    /// A tick that fails (next track unavailable) is logged and the job
    /// keeps running.
    pub fn install(&self, queue: &JobQueue, refresh: Duration) -> JobHandle {
        let engine = self.clone();
        queue.submit(
            TICK_JOB_NAME,
            move || {
                if let Err(e) = engine.tick() {
                    warn!("could not advance playback: {}", e);
                }
                Ok(false)
            },
            Some(refresh),
        )
    }

    pub fn request_play(&self, queue: &JobQueue, track: Track) -> JobHandle {
        let engine = self.clone();
        queue.submit_once(format!("Play {}", track), move || {
            engine.activate(track)?;
            Ok(())
        })
    }

    pub fn request_next(&self, queue: &JobQueue) -> JobHandle {
        let engine = self.clone();
        queue.submit_once("Next track", move || ignore_empty(engine.next()))
    }

    pub fn request_previous(&self, queue: &JobQueue) -> JobHandle {
        let engine = self.clone();
        queue.submit_once("Previous track", move || ignore_empty(engine.previous()))
    }

    pub fn request_play_pause(&self, queue: &JobQueue) -> JobHandle {
        let engine = self.clone();
        queue.submit_once("Play/Pause", move || ignore_empty(engine.play_pause()))
    }

    pub fn request_set_position(&self, queue: &JobQueue, value: f64, relative: bool) -> JobHandle {
        let engine = self.clone();
        queue.submit_once("Set position", move || {
            engine.set_position(value, relative)?;
            Ok(())
        })
    }
}

// Remplace la piste courante : pause si besoin, puis libération du stream
fn retire(state: &mut EngineState, mut old: Playing, mark_played: bool) {
    if old.stream.is_playing() {
        if let Err(e) = old.stream.pause() {
            warn!(track = %old.track, "could not pause replaced stream: {}", e);
        }
    }
    old.stream.close();
    if mark_played {
        state.history.push(old.track);
    }
}

fn ignore_empty(result: Result<()>) -> anyhow::Result<()> {
    match result {
        Err(PlayerError::NothingToPlay) => {
            debug!("nothing to play");
            Ok(())
        }
        other => Ok(other?),
    }
}

fn percent_of(position: u64, length: u64) -> f64 {
    if length == 0 {
        return 0.0;
    }
    (position as f64 / length as f64 * 100.0).min(100.0)
}
