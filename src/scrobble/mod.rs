//! Listen submission to external services, driven purely by the event bus.

pub mod lastfm;
pub mod listenbrainz;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::ConfigConnections;
use crate::events::{EventBus, PlayerEvent};
use crate::library::models::{Song, Tag};

pub use lastfm::LastFmClient;
pub use listenbrainz::ListenBrainzClient;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listen {
    pub artist: String,
    pub track: String,
    pub release: Option<String>,
    /// Seconds.
    pub duration: f64,
    /// Unix timestamp of when the track started.
    pub listened_at: i64,
}

impl Listen {
    pub fn from_song(song: &Song, listened_at: i64) -> Self {
        Self {
            artist: song.artist(),
            track: song.title(),
            release: song.get_tag(&Tag::Album).map(str::to_string),
            duration: song.duration,
            listened_at,
        }
    }
}

#[async_trait]
pub trait ListenSubmitter: Send + Sync {
    fn name(&self) -> &str;

    async fn now_playing(&self, listen: &Listen) -> Result<()>;

    async fn submit_listen(&self, listen: &Listen) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScrobbleAction {
    NowPlaying(Listen),
    Submit(Listen),
}

#[derive(Debug)]
struct Tracked {
    song: Uuid,
    listen: Listen,
    threshold: f64,
    submitted: bool,
}

/// Decides when a listen counts. A track is submitted once, when its
/// position reaches `min(dwell, duration / 2)` or when it finishes,
/// whichever comes first.
#[derive(Debug)]
pub struct ScrobbleTracker {
    dwell: f64,
    current: Option<Tracked>,
}

impl ScrobbleTracker {
    pub fn new(dwell_secs: u64) -> Self {
        Self {
            dwell: dwell_secs as f64,
            current: None,
        }
    }

    fn threshold(&self, duration: f64) -> f64 {
        if duration > 0.0 {
            self.dwell.min(duration / 2.0)
        } else {
            self.dwell
        }
    }

    fn take_submission(&mut self) -> Option<ScrobbleAction> {
        let tracked = self.current.as_mut()?;
        if tracked.submitted {
            return None;
        }
        tracked.submitted = true;
        Some(ScrobbleAction::Submit(tracked.listen.clone()))
    }

    pub fn handle(&mut self, event: &PlayerEvent) -> Option<ScrobbleAction> {
        match event {
            PlayerEvent::NowPlayingChange { song } => {
                let listen = Listen::from_song(song, Utc::now().timestamp());
                self.current = Some(Tracked {
                    song: song.uuid,
                    threshold: self.threshold(song.duration),
                    listen: listen.clone(),
                    submitted: false,
                });
                Some(ScrobbleAction::NowPlaying(listen))
            }
            PlayerEvent::PlaybackInfo { position, .. } => {
                let reached = self
                    .current
                    .as_ref()
                    .is_some_and(|t| *position >= t.threshold);
                if reached {
                    self.take_submission()
                } else {
                    None
                }
            }
            PlayerEvent::TrackFinished { song, .. } => {
                let matches = self.current.as_ref().is_some_and(|t| t.song == *song);
                if matches {
                    self.take_submission()
                } else {
                    None
                }
            }
            PlayerEvent::Stopped => {
                self.current = None;
                None
            }
            _ => None,
        }
    }
}

/// Builds a submitter for every service that has credentials configured.
pub fn build_submitters(connections: &ConfigConnections) -> Vec<Arc<dyn ListenSubmitter>> {
    let mut submitters: Vec<Arc<dyn ListenSubmitter>> = Vec::new();

    match connections
        .listenbrainz_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
    {
        Some(token) => submitters.push(Arc::new(ListenBrainzClient::new(
            &connections.listenbrainz_api_url,
            token,
        ))),
        None => log::info!("[Scrobble] No ListenBrainz token, submission disabled"),
    }

    match &connections.last_fm {
        Some(config) => match LastFmClient::from_config(config) {
            Some(client) => submitters.push(Arc::new(client)),
            None => log::info!("[Scrobble] Last.fm has no session key, submission disabled"),
        },
        None => log::info!("[Scrobble] Last.fm not configured"),
    }

    submitters
}

async fn dispatch(submitters: &[Arc<dyn ListenSubmitter>], action: &ScrobbleAction) {
    for submitter in submitters {
        let result = match action {
            ScrobbleAction::NowPlaying(listen) => submitter.now_playing(listen).await,
            ScrobbleAction::Submit(listen) => submitter.submit_listen(listen).await,
        };
        match result {
            Ok(()) => log::debug!("[Scrobble] {} accepted {:?}", submitter.name(), action),
            Err(e) => log::warn!("[Scrobble] {} submission failed: {:#}", submitter.name(), e),
        }
    }
}

/// Follows the bus and forwards listens until the bus closes. Returns
/// `None` when there is nothing to submit to.
pub fn spawn_connector(
    events: &EventBus,
    submitters: Vec<Arc<dyn ListenSubmitter>>,
    dwell_secs: u64,
) -> Option<JoinHandle<()>> {
    if submitters.is_empty() {
        log::info!("[Scrobble] No services configured, connector not started");
        return None;
    }

    let mut rx = events.subscribe();
    let names: Vec<&str> = submitters.iter().map(|s| s.name()).collect();
    log::info!("[Scrobble] Submitting listens to {}", names.join(", "));

    Some(tokio::spawn(async move {
        let mut tracker = ScrobbleTracker::new(dwell_secs);
        while let Some(event) = rx.recv().await {
            if let Some(action) = tracker.handle(&event) {
                dispatch(&submitters, &action).await;
            }
        }
        log::info!("[Scrobble] Connector stopped");
    }))
}
