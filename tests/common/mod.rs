#![allow(dead_code)]

use cadence_lib::audio::{AudioBackend, BackendEvent, LoadRequest};
use cadence_lib::config::Config;
use cadence_lib::events::EventReceiver;
use cadence_lib::{Engine, PlayerEvent};
use lofty::config::WriteOptions;
use lofty::tag::{Accessor, Tag, TagExt, TagType};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub struct Script {
    pub loads: Vec<LoadRequest>,
    pub pending: Vec<BackendEvent>,
    pub position: f64,
    pub playing: bool,
    pub volume: f32,
}

/// Backend whose events are pushed by the test.
#[derive(Clone, Default)]
pub struct ScriptedBackend(pub Arc<Mutex<Script>>);

impl ScriptedBackend {
    pub fn last_generation(&self) -> u64 {
        self.0.lock().loads.last().map(|l| l.generation).unwrap_or(0)
    }

    pub fn load_count(&self) -> usize {
        self.0.lock().loads.len()
    }

    pub fn finish_current(&self) {
        let generation = self.last_generation();
        self.0
            .lock()
            .pending
            .push(BackendEvent::EndOfTrack { generation });
    }

    pub fn fail_current(&self, message: &str) {
        let generation = self.last_generation();
        self.0.lock().pending.push(BackendEvent::LoadFailed {
            generation,
            message: message.to_string(),
        });
    }

    pub fn volume(&self) -> f32 {
        self.0.lock().volume
    }
}

impl AudioBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn load(&mut self, request: LoadRequest) {
        let mut script = self.0.lock();
        script.position = 0.0;
        script.loads.push(request);
    }

    fn play(&mut self) {
        self.0.lock().playing = true;
    }

    fn pause(&mut self) {
        self.0.lock().playing = false;
    }

    fn stop(&mut self) {
        self.0.lock().playing = false;
    }

    fn seek(&mut self, seconds: f64) {
        self.0.lock().position = seconds;
    }

    fn position(&self) -> f64 {
        self.0.lock().position
    }

    fn set_volume(&mut self, volume: f32) {
        self.0.lock().volume = volume;
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        let mut script = self.0.lock();
        if script.pending.is_empty() {
            None
        } else {
            Some(script.pending.remove(0))
        }
    }
}

pub fn test_config() -> Config {
    Config {
        position_interval_ms: 10,
        ..Config::ephemeral()
    }
}

pub async fn start_engine() -> (Engine, ScriptedBackend) {
    start_engine_with(test_config()).await
}

pub async fn start_engine_with(config: Config) -> (Engine, ScriptedBackend) {
    let backend = ScriptedBackend::default();
    let engine = Engine::start_with_backend(config, Box::new(backend.clone()))
        .await
        .unwrap();
    (engine, backend)
}

/// One second of a 440Hz tone per `seconds`, 16-bit mono.
pub fn write_wav(path: &Path, seconds: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for t in 0..(8000 * seconds) {
        let sample = (t as f32 * 440.0 * 2.0 * std::f32::consts::PI / 8000.0).sin();
        writer.write_sample((sample * i16::MAX as f32 * 0.2) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

pub fn write_tagged_wav(path: &Path, seconds: u32, title: &str, artist: &str, album: &str) {
    write_wav(path, seconds);
    let mut tag = Tag::new(TagType::Id3v2);
    tag.set_title(title.to_string());
    tag.set_artist(artist.to_string());
    tag.set_album(album.to_string());
    tag.save_to_path(path, WriteOptions::default()).unwrap();
}

/// Waits for the next event called `name`, skipping everything else.
pub async fn wait_for(rx: &mut EventReceiver, name: &str) -> PlayerEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Some(event) if event.name() == name => return event,
                Some(_) => continue,
                None => panic!("event bus closed while waiting for {}", name),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", name))
}
