use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::buffer::AudioBuffer;
use super::types::SharedState;

const SOURCE_CHANNELS: usize = 2;

/// Owns the cpal stream for its whole life. Reconnects when the default
/// device goes away or changes.
pub fn run_audio_output(state: SharedState, buffer: Arc<AudioBuffer>) {
    let host = cpal::default_host();
    let mut current_device_name: Option<String> = None;
    let mut no_device_logged = false;

    loop {
        if state.shutdown.load(Ordering::Relaxed) {
            break;
        }

        let device = match host.default_output_device() {
            Some(d) => {
                no_device_logged = false;
                d
            }
            None => {
                if !no_device_logged {
                    log::warn!("[Output] No audio output device found, retrying");
                    no_device_logged = true;
                }
                thread::sleep(Duration::from_secs(1));
                continue;
            }
        };

        let device_name = device.name().unwrap_or_default();
        if current_device_name.as_ref() != Some(&device_name) {
            log::info!("[Output] Using device '{}'", device_name);
            current_device_name = Some(device_name);
        }

        let config = match device.default_output_config() {
            Ok(c) => c,
            Err(e) => {
                log::error!("[Output] Failed to get audio config: {}", e);
                thread::sleep(Duration::from_secs(1));
                continue;
            }
        };

        state
            .device_sample_rate
            .store(config.sample_rate().0, Ordering::Relaxed);
        state
            .device_channels
            .store(config.channels(), Ordering::Relaxed);

        let err_fn = |err| log::error!("[Output] Stream error: {}", err);

        let stream_result = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                run_stream::<f32>(&device, &config.into(), state.clone(), buffer.clone(), err_fn)
            }
            cpal::SampleFormat::I16 => {
                run_stream::<i16>(&device, &config.into(), state.clone(), buffer.clone(), err_fn)
            }
            cpal::SampleFormat::U16 => {
                run_stream::<u16>(&device, &config.into(), state.clone(), buffer.clone(), err_fn)
            }
            _ => Err(cpal::BuildStreamError::StreamConfigNotSupported),
        };

        match stream_result {
            Ok(stream) => {
                if let Err(e) = stream.play() {
                    log::error!("[Output] Could not start stream: {}", e);
                } else {
                    // Park here until shutdown or the default device changes.
                    loop {
                        if state.shutdown.load(Ordering::Relaxed) {
                            break;
                        }
                        let new_name = host.default_output_device().and_then(|d| d.name().ok());
                        if new_name.as_ref() != current_device_name.as_ref() {
                            break;
                        }
                        thread::sleep(Duration::from_millis(500));
                    }
                }
            }
            Err(e) => log::error!("[Output] Could not create audio stream: {}", e),
        }
        thread::sleep(Duration::from_millis(500));
    }

    log::info!("[Output] Thread exiting");
}

/// Spreads stereo frames over `device_channels` outputs.
fn map_channels(stereo: &[f32], device_channels: usize, out: &mut [f32], volume: f32) {
    for (frame, dst) in stereo
        .chunks_exact(SOURCE_CHANNELS)
        .zip(out.chunks_exact_mut(device_channels))
    {
        match device_channels {
            1 => dst[0] = (frame[0] + frame[1]) * 0.5 * volume,
            _ => {
                dst[0] = frame[0] * volume;
                dst[1] = frame[1] * volume;
                for extra in dst.iter_mut().skip(2) {
                    *extra = 0.0;
                }
            }
        }
    }
}

pub fn run_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    state: SharedState,
    buffer: Arc<AudioBuffer>,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut stereo = Vec::new();
    let mut mixed = Vec::new();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if !state.is_playing.load(Ordering::Relaxed) || channels == 0 {
                data.fill(T::from_sample(0.0));
                return;
            }

            let frames = data.len() / channels;
            stereo.resize(frames * SOURCE_CHANNELS, 0.0);
            mixed.resize(data.len(), 0.0);

            let read = buffer.pop_samples(&mut stereo);
            let frames_read = read / SOURCE_CHANNELS;
            mixed.fill(0.0);
            map_channels(
                &stereo[..frames_read * SOURCE_CHANNELS],
                channels,
                &mut mixed,
                state.get_volume(),
            );

            for (sample, value) in data.iter_mut().zip(mixed.iter()) {
                *sample = T::from_sample(*value);
            }

            if frames_read > 0 {
                let dev_rate = state.device_sample_rate.load(Ordering::Relaxed) as f64;
                let src_rate = state.sample_rate.load(Ordering::Relaxed) as f64;
                let ratio = if dev_rate > 0.0 {
                    src_rate / dev_rate
                } else {
                    1.0
                };
                let source_frames = (frames_read as f64 * ratio) as u64;
                state
                    .position_samples
                    .fetch_add(source_frames, Ordering::Relaxed);
            }
        },
        err_fn,
        None,
    )
}
