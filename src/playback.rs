use crate::audio::{AudioBackend, BackendEvent, LoadRequest};
use crate::errors::AppError;
use crate::events::{EventBus, PlayerEvent};
use crate::library::LibraryIndex;
use crate::queue::{PlayQueue, QueueEntry};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// `prev` restarts the current track instead of going back once playback
/// is past this point.
pub const RESTART_THRESHOLD_SECS: f64 = 3.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub position: f64,
    pub duration: f64,
    pub volume: f32,
    pub shuffle: bool,
}

/// A volume between 0.0 and 1.0. Out of range input is clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeLevel(f32);

impl VolumeLevel {
    pub fn new(level: f64) -> Self {
        if level.is_nan() {
            return Self(0.0);
        }
        Self(level.clamp(0.0, 1.0) as f32)
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl From<f64> for VolumeLevel {
    fn from(level: f64) -> Self {
        Self::new(level)
    }
}

impl From<f32> for VolumeLevel {
    fn from(level: f32) -> Self {
        Self::new(level as f64)
    }
}

/// Accepts "0.4" as well as "40%".
impl FromStr for VolumeLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || AppError::InvalidInput(format!("Invalid volume level '{}'", s));
        match s.strip_suffix('%') {
            Some(percent) => percent
                .trim()
                .parse::<f64>()
                .map(|p| Self::new(p / 100.0))
                .map_err(|_| invalid()),
            None => s.parse::<f64>().map(Self::new).map_err(|_| invalid()),
        }
    }
}

/// Transport state machine on top of an [`AudioBackend`]. The controller
/// owns what is loaded; the queue decides what comes next.
pub struct PlaybackController {
    backend: Box<dyn AudioBackend>,
    events: EventBus,
    status: PlaybackStatus,
    position: f64,
    duration: f64,
    volume: f32,
    generation: u64,
    loaded: Option<QueueEntry>,
}

impl PlaybackController {
    pub fn new(backend: Box<dyn AudioBackend>, events: EventBus) -> Self {
        log::info!("[AudioController] Using {} backend", backend.name());
        Self {
            backend,
            events,
            status: PlaybackStatus::Stopped,
            position: 0.0,
            duration: 0.0,
            volume: 1.0,
            generation: 0,
            loaded: None,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn now_playing(&self) -> Option<&QueueEntry> {
        self.loaded.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn state(&self, queue: &PlayQueue) -> PlaybackState {
        PlaybackState {
            status: self.status,
            position: self.position,
            duration: self.duration,
            volume: self.volume,
            shuffle: queue.is_shuffled(),
        }
    }

    fn clamp_to_duration(&self, seconds: f64) -> f64 {
        if self.duration > 0.0 {
            seconds.clamp(0.0, self.duration)
        } else {
            seconds.max(0.0)
        }
    }

    /// Loads the queue head and starts it. Heads that cannot be resolved
    /// are reported and skipped.
    pub fn start_head(&mut self, queue: &mut PlayQueue, library: &LibraryIndex) {
        while let Some(entry) = queue.head().cloned() {
            match self.load_entry(&entry, library) {
                Ok(()) => return,
                Err(e) => {
                    log::error!("[AudioController] Cannot play {}: {}", entry.song, e);
                    self.report(&e);
                    advance_queue(queue, library);
                    self.events.emit_lossy(PlayerEvent::QueueUpdated);
                }
            }
        }
        self.halt();
    }

    fn load_entry(&mut self, entry: &QueueEntry, library: &LibraryIndex) -> Result<(), AppError> {
        let song = library.get(&entry.song)?;
        let path = song
            .primary_location()
            .ok_or_else(|| AppError::BackendLoad(format!("song {} has no location", song.uuid)))?;

        self.generation += 1;
        self.backend.load(LoadRequest {
            path: path.to_path_buf(),
            generation: self.generation,
            duration_hint: song.duration,
        });
        self.backend.set_volume(self.volume);
        self.backend.play();

        self.loaded = Some(entry.clone());
        self.position = 0.0;
        self.duration = song.duration;
        self.status = PlaybackStatus::Playing;

        log::info!("[AudioController] Now playing {}", song.title());
        self.events.emit_lossy(PlayerEvent::NowPlayingChange {
            song: Box::new(song.clone()),
        });
        self.events.emit_lossy(PlayerEvent::Playing);
        Ok(())
    }

    fn report(&self, error: &AppError) {
        self.events.emit_lossy(PlayerEvent::PlaybackError {
            code: error.code().to_string(),
            message: error.to_string(),
        });
    }

    /// Releases the backend and goes to Stopped without touching the queue.
    fn halt(&mut self) {
        let was_active = self.loaded.is_some() || self.status != PlaybackStatus::Stopped;
        self.backend.stop();
        self.generation += 1;
        self.loaded = None;
        self.position = 0.0;
        self.duration = 0.0;
        self.status = PlaybackStatus::Stopped;
        if was_active {
            self.events.emit_lossy(PlayerEvent::Stopped);
        }
    }

    pub fn play(&mut self, queue: &mut PlayQueue, library: &LibraryIndex) {
        match self.status {
            PlaybackStatus::Playing => {}
            PlaybackStatus::Paused => {
                self.backend.play();
                self.status = PlaybackStatus::Playing;
                self.events.emit_lossy(PlayerEvent::Playing);
            }
            PlaybackStatus::Stopped => {
                if !queue.is_empty() {
                    self.start_head(queue, library);
                }
            }
        }
    }

    pub fn pause(&mut self) {
        if self.status != PlaybackStatus::Playing {
            return;
        }
        self.backend.pause();
        self.position = self.clamp_to_duration(self.backend.position());
        self.status = PlaybackStatus::Paused;
        self.events.emit_lossy(PlayerEvent::Paused);
    }

    pub fn stop(&mut self) {
        self.halt();
    }

    /// Skips the current entry. Counts as a skip when something was loaded.
    pub fn next(&mut self, queue: &mut PlayQueue, library: &mut LibraryIndex) {
        if let Some(entry) = &self.loaded {
            if let Err(e) = library.record_skip(&entry.song) {
                log::debug!("[AudioController] Skip not recorded: {}", e);
            }
        }
        advance_queue(queue, library);
        self.events.emit_lossy(PlayerEvent::QueueUpdated);
        self.start_head(queue, library);
    }

    pub fn prev(&mut self, queue: &mut PlayQueue, library: &LibraryIndex) {
        let position = self.current_position();
        if self.loaded.is_some() && position > RESTART_THRESHOLD_SECS {
            self.seek_seconds(0.0);
            return;
        }
        if queue.previous().is_some() {
            self.events.emit_lossy(PlayerEvent::QueueUpdated);
            self.start_head(queue, library);
        } else if self.loaded.is_some() {
            self.seek_seconds(0.0);
        }
    }

    /// Seeks within the loaded track. Paused playback stays paused.
    pub fn seek(&mut self, position_ms: u64) {
        self.seek_seconds(position_ms as f64 / 1000.0);
    }

    fn seek_seconds(&mut self, seconds: f64) {
        if self.loaded.is_none() {
            return;
        }
        let target = self.clamp_to_duration(seconds);
        self.backend.seek(target);
        self.position = target;
        self.events.emit_lossy(PlayerEvent::PlaybackInfo {
            position: self.position,
            duration: self.duration,
        });
    }

    pub fn set_volume(&mut self, level: VolumeLevel) {
        self.volume = level.get();
        self.backend.set_volume(self.volume);
    }

    fn current_position(&self) -> f64 {
        match self.status {
            PlaybackStatus::Playing => self.clamp_to_duration(self.backend.position()),
            _ => self.position,
        }
    }

    /// One beat of the position feed. Drains backend events, handles track
    /// ends and load failures, and publishes the position. Does nothing
    /// unless playing.
    pub fn tick(&mut self, queue: &mut PlayQueue, library: &mut LibraryIndex) {
        if self.status != PlaybackStatus::Playing {
            return;
        }

        while let Some(event) = self.backend.poll_event() {
            if event.generation() != self.generation {
                log::debug!("[AudioController] Ignoring stale backend event {:?}", event);
                continue;
            }
            match event {
                BackendEvent::Loaded { duration, .. } => {
                    if duration > 0.0 {
                        self.duration = duration;
                    }
                }
                BackendEvent::LoadFailed { message, .. } => {
                    let error = AppError::BackendLoad(message);
                    log::error!("[AudioController] {}", error);
                    self.report(&error);
                    self.finish_track(queue, library, false);
                }
                BackendEvent::EndOfTrack { .. } => {
                    self.finish_track(queue, library, true);
                }
            }
        }

        if self.status == PlaybackStatus::Playing {
            self.position = self.clamp_to_duration(self.backend.position());
            self.events.emit_lossy(PlayerEvent::PlaybackInfo {
                position: self.position,
                duration: self.duration,
            });
        }
    }

    fn finish_track(&mut self, queue: &mut PlayQueue, library: &mut LibraryIndex, completed: bool) {
        if completed {
            if let Some(entry) = &self.loaded {
                let played = self.duration;
                if let Err(e) = library.record_play(&entry.song, played) {
                    log::debug!("[AudioController] Play not recorded: {}", e);
                }
                self.events.emit_lossy(PlayerEvent::TrackFinished {
                    song: entry.song,
                    played,
                });
            }
        }
        advance_queue(queue, library);
        self.events.emit_lossy(PlayerEvent::QueueUpdated);
        self.start_head(queue, library);
    }
}

/// Moves the queue on. Shuffle never draws a song that carries a ban.
fn advance_queue(queue: &mut PlayQueue, library: &LibraryIndex) {
    queue.advance_skipping(|entry| {
        library
            .get(&entry.song)
            .is_ok_and(|song| song.banned.is_some())
    });
}
