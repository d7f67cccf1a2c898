use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::native::NativeBackend;
use super::null::NullBackend;

/// Asks a backend to open a file. `generation` tags every event the load
/// produces so the controller can drop results of superseded loads.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub path: PathBuf,
    pub generation: u64,
    /// Duration known from the library, in seconds. Zero when unknown.
    pub duration_hint: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Loaded { generation: u64, duration: f64 },
    LoadFailed { generation: u64, message: String },
    EndOfTrack { generation: u64 },
}

impl BackendEvent {
    pub fn generation(&self) -> u64 {
        match self {
            BackendEvent::Loaded { generation, .. }
            | BackendEvent::LoadFailed { generation, .. }
            | BackendEvent::EndOfTrack { generation } => *generation,
        }
    }
}

/// Capability set the playback controller drives. Loading is asynchronous:
/// `load` returns immediately and the outcome shows up in `poll_event`.
pub trait AudioBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn load(&mut self, request: LoadRequest);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, seconds: f64);
    /// Seconds into the loaded track.
    fn position(&self) -> f64;
    fn set_volume(&mut self, volume: f32);
    fn poll_event(&mut self) -> Option<BackendEvent>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// symphonia decoding into a cpal output stream.
    #[default]
    Native,
    /// Clock-driven stand-in for machines without an audio device.
    Null,
}

pub fn create_backend(kind: BackendKind) -> Box<dyn AudioBackend> {
    match kind {
        BackendKind::Native => Box::new(NativeBackend::new()),
        BackendKind::Null => Box::new(NullBackend::new()),
    }
}
