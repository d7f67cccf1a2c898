use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use super::backend::{AudioBackend, BackendEvent, LoadRequest};
use super::buffer::AudioBuffer;
use super::decoder::decoder_thread;
use super::output::run_audio_output;
use super::types::{DecoderCommand, SharedState, BUFFER_SIZE};

/// Local-file backend: a decoder thread feeding a cpal output thread
/// through a shared sample buffer.
pub struct NativeBackend {
    state: SharedState,
    command_tx: Sender<DecoderCommand>,
    event_rx: Receiver<BackendEvent>,
    threads: Vec<JoinHandle<()>>,
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeBackend {
    pub fn new() -> Self {
        let state = SharedState::new();
        let buffer = Arc::new(AudioBuffer::new(BUFFER_SIZE));
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();

        let mut threads = Vec::new();

        let output_state = state.clone();
        let output_buffer = buffer.clone();
        match thread::Builder::new()
            .name("cadence-output".into())
            .spawn(move || run_audio_output(output_state, output_buffer))
        {
            Ok(handle) => threads.push(handle),
            Err(e) => log::error!("[AudioController] Failed to spawn output thread: {}", e),
        }

        let decoder_state = state.clone();
        match thread::Builder::new()
            .name("cadence-decoder".into())
            .spawn(move || decoder_thread(command_rx, event_tx, decoder_state, buffer))
        {
            Ok(handle) => threads.push(handle),
            Err(e) => log::error!("[AudioController] Failed to spawn decoder thread: {}", e),
        }

        Self {
            state,
            command_tx,
            event_rx,
            threads,
        }
    }

    fn send(&self, command: DecoderCommand) {
        if self.command_tx.send(command).is_err() {
            log::error!("[AudioController] Decoder thread is gone");
        }
    }
}

impl AudioBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn load(&mut self, request: LoadRequest) {
        self.state
            .generation
            .store(request.generation, Ordering::Release);
        self.state.position_samples.store(0, Ordering::Relaxed);
        self.send(DecoderCommand::Load(request));
    }

    fn play(&mut self) {
        self.state.is_playing.store(true, Ordering::Relaxed);
    }

    fn pause(&mut self) {
        self.state.is_playing.store(false, Ordering::Relaxed);
    }

    fn stop(&mut self) {
        self.state.is_playing.store(false, Ordering::Relaxed);
        self.state.generation.fetch_add(1, Ordering::AcqRel);
        self.send(DecoderCommand::Stop);
    }

    fn seek(&mut self, seconds: f64) {
        self.state.set_position_seconds(seconds);
        self.send(DecoderCommand::Seek(seconds));
    }

    fn position(&self) -> f64 {
        self.state.get_position_seconds()
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.set_volume(volume);
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        self.event_rx.try_recv().ok()
    }
}

impl Drop for NativeBackend {
    fn drop(&mut self) {
        self.state.shutdown.store(true, Ordering::Relaxed);
        let _ = self.command_tx.send(DecoderCommand::Shutdown);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}
