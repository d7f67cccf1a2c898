use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use symphonia::core::codecs::Decoder;
use symphonia::core::formats::FormatReader;

use super::backend::LoadRequest;

pub const BUFFER_SIZE: usize = 44100 * 2 * 2; // ~2 seconds of stereo at 44.1k

/// State shared between the backend handle, the decoder thread and the
/// cpal callback.
#[derive(Clone)]
pub struct SharedState {
    pub position_samples: Arc<AtomicU64>,
    pub sample_rate: Arc<AtomicU64>,
    pub is_playing: Arc<AtomicBool>,
    pub volume: Arc<AtomicU64>,
    pub device_sample_rate: Arc<AtomicU32>,
    pub device_channels: Arc<AtomicU16>,
    /// Generation of the most recent load request.
    pub generation: Arc<AtomicU64>,
    pub shutdown: Arc<AtomicBool>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            position_samples: Arc::new(AtomicU64::new(0)),
            sample_rate: Arc::new(AtomicU64::new(44100)),
            is_playing: Arc::new(AtomicBool::new(false)),
            volume: Arc::new(AtomicU64::new(f32::to_bits(1.0) as u64)),
            device_sample_rate: Arc::new(AtomicU32::new(0)),
            device_channels: Arc::new(AtomicU16::new(2)),
            generation: Arc::new(AtomicU64::new(0)),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn get_position_seconds(&self) -> f64 {
        let samples = self.position_samples.load(Ordering::Relaxed);
        let sample_rate = self.sample_rate.load(Ordering::Relaxed).max(1);
        samples as f64 / sample_rate as f64
    }

    pub fn set_position_seconds(&self, seconds: f64) {
        let sample_rate = self.sample_rate.load(Ordering::Relaxed);
        self.position_samples
            .store((seconds.max(0.0) * sample_rate as f64) as u64, Ordering::Relaxed);
    }

    pub fn get_volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed) as u32)
    }

    pub fn set_volume(&self, vol: f32) {
        self.volume
            .store(f32::to_bits(vol.clamp(0.0, 1.0)) as u64, Ordering::Relaxed);
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }
}

pub enum DecoderCommand {
    Load(LoadRequest),
    Seek(f64),
    Stop,
    Shutdown,
}

/// An opened file ready for decoding.
pub struct LoadedTrack {
    pub reader: Box<dyn FormatReader>,
    pub decoder: Box<dyn Decoder>,
    pub track_id: u32,
    pub sample_rate: u32,
    pub duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_is_clamped() {
        let state = SharedState::new();
        state.set_volume(1.7);
        assert_eq!(state.get_volume(), 1.0);
        state.set_volume(-0.2);
        assert_eq!(state.get_volume(), 0.0);
        state.set_volume(0.25);
        assert_eq!(state.get_volume(), 0.25);
    }

    #[test]
    fn test_position_round_trip() {
        let state = SharedState::new();
        state.sample_rate.store(48000, Ordering::Relaxed);
        state.set_position_seconds(2.5);
        assert_eq!(state.position_samples.load(Ordering::Relaxed), 120000);
        assert!((state.get_position_seconds() - 2.5).abs() < 1e-9);
    }
}
