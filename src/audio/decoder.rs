use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{SeekMode, SeekTo};
use symphonia::core::units::Time;

use super::backend::{BackendEvent, LoadRequest};
use super::buffer::AudioBuffer;
use super::loader::load_track;
use super::types::{DecoderCommand, LoadedTrack, SharedState};

const CHANNELS: usize = 2;
const RESAMPLER_CHUNK: usize = 1024;
/// Room the decoder wants in the ring buffer before decoding another packet.
const MIN_FREE_SPACE: usize = 16384;

/// Interleaved stereo in, interleaved stereo at the device rate out.
struct StereoResampler {
    inner: SincFixedIn<f32>,
    input: Vec<Vec<f32>>,
    pending: VecDeque<f32>,
}

impl StereoResampler {
    fn new(source_rate: u32, device_rate: u32) -> Option<Self> {
        if device_rate == 0 || device_rate == source_rate {
            return None;
        }
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            window: WindowFunction::BlackmanHarris2,
            oversampling_factor: 128,
        };
        match SincFixedIn::<f32>::new(
            device_rate as f64 / source_rate as f64,
            2.0,
            params,
            RESAMPLER_CHUNK,
            CHANNELS,
        ) {
            Ok(inner) => Some(Self {
                inner,
                input: vec![vec![0.0; RESAMPLER_CHUNK]; CHANNELS],
                pending: VecDeque::new(),
            }),
            Err(e) => {
                log::warn!("[Decoder] Resampler unavailable, playing at source rate: {}", e);
                None
            }
        }
    }

    fn interleave(frames: &[Vec<f32>]) -> Vec<f32> {
        let len = frames.first().map(Vec::len).unwrap_or(0);
        let mut out = Vec::with_capacity(len * CHANNELS);
        for i in 0..len {
            for channel in frames.iter().take(CHANNELS) {
                out.push(channel[i]);
            }
        }
        out
    }

    fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        self.pending.extend(samples.iter());
        let mut out = Vec::new();

        loop {
            let chunk = self.inner.input_frames_next();
            if self.pending.len() < chunk * CHANNELS {
                break;
            }
            for channel in self.input.iter_mut() {
                channel.resize(chunk, 0.0);
            }
            for i in 0..chunk {
                for c in 0..CHANNELS {
                    self.input[c][i] = self.pending[i * CHANNELS + c];
                }
            }
            self.pending.drain(..chunk * CHANNELS);

            match self.inner.process(&self.input, None) {
                Ok(frames) => out.extend(Self::interleave(&frames)),
                Err(e) => log::warn!("[Decoder] Resample error: {}", e),
            }
        }
        out
    }

    /// Pushes the last partial chunk through at end of stream.
    fn flush(&mut self) -> Vec<f32> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let frames = self.pending.len() / CHANNELS;
        let mut partial = vec![Vec::with_capacity(frames); CHANNELS];
        for i in 0..frames {
            for (c, channel) in partial.iter_mut().enumerate() {
                channel.push(self.pending[i * CHANNELS + c]);
            }
        }
        self.pending.clear();

        match self.inner.process_partial(Some(partial.as_slice()), None) {
            Ok(out) => Self::interleave(&out),
            Err(e) => {
                log::warn!("[Decoder] Resample flush error: {}", e);
                Vec::new()
            }
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.pending.clear();
    }
}

struct ActiveTrack {
    track: LoadedTrack,
    generation: u64,
    sample_buf: Option<SampleBuffer<f32>>,
    resampler: Option<StereoResampler>,
    /// Decoder hit the end, waiting for the output to drain.
    exhausted: bool,
}

/// Downmixes or upmixes an interleaved block to stereo.
fn to_stereo(samples: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        2 => samples.to_vec(),
        n => samples
            .chunks_exact(n)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

fn push_all(samples: &[f32], buffer: &AudioBuffer, state: &SharedState, generation: u64) {
    let mut written = 0;
    while written < samples.len() {
        // A newer load or a shutdown makes the rest of this block worthless.
        if state.shutdown.load(Ordering::Relaxed) || !state.is_current(generation) {
            return;
        }
        let w = buffer.push_samples(&samples[written..]);
        if w == 0 {
            thread::sleep(Duration::from_millis(2));
        }
        written += w;
    }
}

fn open(request: &LoadRequest, state: &SharedState) -> Result<ActiveTrack, String> {
    let track = load_track(&request.path).map_err(|e| e.to_string())?;
    let device_rate = state.device_sample_rate.load(Ordering::Relaxed);
    let resampler = StereoResampler::new(track.sample_rate, device_rate);
    Ok(ActiveTrack {
        track,
        generation: request.generation,
        sample_buf: None,
        resampler,
        exhausted: false,
    })
}

fn seek(active: &mut ActiveTrack, seconds: f64, state: &SharedState, buffer: &AudioBuffer) {
    let time = Time::new(seconds.trunc() as u64, seconds.fract());
    let result = active.track.reader.seek(
        SeekMode::Accurate,
        SeekTo::Time {
            time,
            track_id: Some(active.track.track_id),
        },
    );
    match result {
        Ok(_) => {
            active.track.decoder.reset();
            if let Some(r) = active.resampler.as_mut() {
                r.reset();
            }
            buffer.clear();
            active.exhausted = false;
            state.set_position_seconds(seconds);
        }
        Err(e) => log::warn!("[Decoder] Seek to {:.2}s failed: {}", seconds, e),
    }
}

/// Decodes one packet of the active track into `buffer`. Returns false
/// once the stream has no more packets.
fn decode_next(active: &mut ActiveTrack, state: &SharedState, buffer: &AudioBuffer) -> bool {
    let packet = match active.track.reader.next_packet() {
        Ok(packet) => packet,
        Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return false;
        }
        Err(SymphoniaError::ResetRequired) => {
            active.track.decoder.reset();
            return true;
        }
        Err(e) => {
            log::warn!("[Decoder] Stopping stream after read error: {}", e);
            return false;
        }
    };

    if packet.track_id() != active.track.track_id {
        return true;
    }

    let decoded = match active.track.decoder.decode(&packet) {
        Ok(decoded) => decoded,
        Err(SymphoniaError::DecodeError(e)) => {
            log::debug!("[Decoder] Skipping corrupt packet: {}", e);
            return true;
        }
        Err(e) => {
            log::warn!("[Decoder] Decode failed: {}", e);
            return false;
        }
    };

    let spec = *decoded.spec();
    let channels = spec.channels.count();
    let sample_buf = active
        .sample_buf
        .get_or_insert_with(|| SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
    if sample_buf.capacity() < decoded.capacity() * channels {
        *sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
    }
    sample_buf.copy_interleaved_ref(decoded);

    let stereo = to_stereo(sample_buf.samples(), channels);
    let out = match active.resampler.as_mut() {
        Some(r) => r.process(&stereo),
        None => stereo,
    };
    push_all(&out, buffer, state, active.generation);
    true
}

pub fn decoder_thread(
    command_rx: Receiver<DecoderCommand>,
    event_tx: Sender<BackendEvent>,
    state: SharedState,
    buffer: Arc<AudioBuffer>,
) {
    let mut current: Option<ActiveTrack> = None;

    loop {
        if state.shutdown.load(Ordering::Relaxed) {
            break;
        }

        let busy = current.as_ref().is_some_and(|t| !t.exhausted)
            && state.is_playing.load(Ordering::Relaxed);
        let command = if busy {
            match command_rx.try_recv() {
                Ok(cmd) => Some(cmd),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            match command_rx.recv_timeout(Duration::from_millis(20)) {
                Ok(cmd) => Some(cmd),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        };

        match command {
            Some(DecoderCommand::Load(request)) => {
                current = None;
                buffer.clear();
                if !state.is_current(request.generation) {
                    continue;
                }
                match open(&request, &state) {
                    Ok(active) => {
                        if !state.is_current(request.generation) {
                            log::debug!("[Decoder] Dropping superseded load {:?}", request.path);
                            continue;
                        }
                        state
                            .sample_rate
                            .store(active.track.sample_rate as u64, Ordering::Relaxed);
                        state.position_samples.store(0, Ordering::Relaxed);
                        let duration = if active.track.duration > 0.0 {
                            active.track.duration
                        } else {
                            request.duration_hint
                        };
                        let _ = event_tx.send(BackendEvent::Loaded {
                            generation: request.generation,
                            duration,
                        });
                        current = Some(active);
                    }
                    Err(message) => {
                        log::error!("[Decoder] Failed to load {:?}: {}", request.path, message);
                        let _ = event_tx.send(BackendEvent::LoadFailed {
                            generation: request.generation,
                            message,
                        });
                    }
                }
            }
            Some(DecoderCommand::Seek(seconds)) => {
                if let Some(active) = current.as_mut() {
                    seek(active, seconds, &state, &buffer);
                }
            }
            Some(DecoderCommand::Stop) => {
                current = None;
                buffer.clear();
                state.position_samples.store(0, Ordering::Relaxed);
            }
            Some(DecoderCommand::Shutdown) => break,
            None => {}
        }

        if !state.is_playing.load(Ordering::Relaxed) {
            continue;
        }

        let Some(active) = current.as_mut() else {
            continue;
        };

        if active.exhausted {
            if buffer.is_empty() {
                let _ = event_tx.send(BackendEvent::EndOfTrack {
                    generation: active.generation,
                });
                current = None;
            }
            continue;
        }

        if buffer.available_space() < MIN_FREE_SPACE {
            thread::sleep(Duration::from_millis(5));
            continue;
        }

        if !decode_next(active, &state, &buffer) {
            if let Some(r) = active.resampler.as_mut() {
                let tail = r.flush();
                push_all(&tail, &buffer, &state, active.generation);
            }
            active.exhausted = true;
        }
    }

    log::info!("[Decoder] Thread exiting");
}
