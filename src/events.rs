//! Typed notifications fanned out to every presentation client.
//!
//! Each subscriber owns an unbounded `tokio::sync::mpsc` channel. A slow
//! subscriber only grows its own backlog: it never loses events and never
//! blocks the publisher. Senders whose receiver was dropped are pruned on the
//! next emit.

use crate::library::models::Song;
use crate::playlist::PlaylistInfo;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub type EventReceiver = mpsc::UnboundedReceiver<PlayerEvent>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// A scan or library mutation finished.
    LibraryLoaded { songs: usize },
    PlaylistsGotten { playlists: Vec<PlaylistInfo> },
    QueueUpdated,
    Playing,
    Paused,
    Stopped,
    /// Periodic position feed while playing, both values in seconds.
    PlaybackInfo { position: f64, duration: f64 },
    NowPlayingChange { song: Box<Song> },
    /// A track played through to its end.
    TrackFinished { song: Uuid, played: f64 },
    PlaybackError { code: String, message: String },
}

impl PlayerEvent {
    /// Topic name a UI listens on.
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::LibraryLoaded { .. } => "library_loaded",
            PlayerEvent::PlaylistsGotten { .. } => "playlists_gotten",
            PlayerEvent::QueueUpdated => "queue_updated",
            PlayerEvent::Playing => "playing",
            PlayerEvent::Paused => "paused",
            PlayerEvent::Stopped => "stopped",
            PlayerEvent::PlaybackInfo { .. } => "playback_info",
            PlayerEvent::NowPlayingChange { .. } => "now_playing_change",
            PlayerEvent::TrackFinished { .. } => "track_finished",
            PlayerEvent::PlaybackError { .. } => "playback_error",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<PlayerEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Returns the number of subscribers reached, or the event back when
    /// nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, PlayerEvent> {
        // Sending under the lock keeps publish order across threads.
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        match subscribers.len() {
            0 => Err(event),
            n => Ok(n),
        }
    }

    /// Fire-and-forget emit for events nobody has to receive.
    pub fn emit_lossy(&self, event: PlayerEvent) {
        if let Err(event) = self.emit(event) {
            log::trace!("[Events] No subscribers for {}", event.name());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Drops every sender. Receivers drain what is queued and then see the
    /// end of the stream.
    pub fn close(&self) {
        self.subscribers.lock().clear();
    }
}
