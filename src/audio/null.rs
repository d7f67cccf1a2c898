use std::collections::VecDeque;
use std::time::Instant;

use super::backend::{AudioBackend, BackendEvent, LoadRequest};

/// Plays nothing, but keeps time like a real device would. Used on
/// machines without audio output.
#[derive(Debug, Default)]
pub struct NullBackend {
    generation: u64,
    loaded: bool,
    duration: f64,
    /// Position accumulated before the current play stretch.
    offset: f64,
    started: Option<Instant>,
    ended: bool,
    volume: f32,
    events: VecDeque<BackendEvent>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            volume: 1.0,
            ..Default::default()
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn elapsed(&self) -> f64 {
        self.started
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn load(&mut self, request: LoadRequest) {
        self.generation = request.generation;
        self.offset = 0.0;
        self.started = None;
        self.ended = false;

        if request.path.is_file() {
            self.loaded = true;
            self.duration = request.duration_hint;
            self.events.push_back(BackendEvent::Loaded {
                generation: request.generation,
                duration: request.duration_hint,
            });
        } else {
            self.loaded = false;
            self.events.push_back(BackendEvent::LoadFailed {
                generation: request.generation,
                message: format!("{} does not exist", request.path.display()),
            });
        }
    }

    fn play(&mut self) {
        if self.loaded && self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.offset += self.elapsed();
        self.started = None;
    }

    fn stop(&mut self) {
        self.loaded = false;
        self.offset = 0.0;
        self.started = None;
    }

    fn seek(&mut self, seconds: f64) {
        self.offset = seconds.max(0.0);
        self.ended = false;
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }

    fn position(&self) -> f64 {
        let position = self.offset + self.elapsed();
        if self.duration > 0.0 {
            position.min(self.duration)
        } else {
            position
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        if self.loaded && !self.ended && self.duration > 0.0 && self.position() >= self.duration {
            self.ended = true;
            return Some(BackendEvent::EndOfTrack {
                generation: self.generation,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(path: PathBuf, duration: f64) -> LoadRequest {
        LoadRequest {
            path,
            generation: 7,
            duration_hint: duration,
        }
    }

    #[test]
    fn test_missing_file_fails_to_load() {
        let mut backend = NullBackend::new();
        backend.load(request(PathBuf::from("/definitely/not/here.flac"), 3.0));
        assert!(matches!(
            backend.poll_event(),
            Some(BackendEvent::LoadFailed { generation: 7, .. })
        ));
        assert_eq!(backend.poll_event(), None);
    }

    #[test]
    fn test_seek_past_end_reports_end_of_track() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut backend = NullBackend::new();
        backend.load(request(file.path().to_path_buf(), 3.0));
        assert!(matches!(
            backend.poll_event(),
            Some(BackendEvent::Loaded { generation: 7, .. })
        ));

        backend.play();
        backend.seek(3.0);
        assert_eq!(backend.position(), 3.0);
        assert_eq!(
            backend.poll_event(),
            Some(BackendEvent::EndOfTrack { generation: 7 })
        );
        assert_eq!(backend.poll_event(), None);
    }

    #[test]
    fn test_pause_freezes_position() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut backend = NullBackend::new();
        backend.load(request(file.path().to_path_buf(), 60.0));
        backend.play();
        backend.seek(10.0);
        backend.pause();
        let frozen = backend.position();
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(backend.position(), frozen);
        assert!(frozen >= 10.0);
    }
}
