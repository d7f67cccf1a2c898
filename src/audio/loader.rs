use std::fs::File;
use std::path::Path;

use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::types::LoadedTrack;
use crate::errors::AppError;

pub fn load_track(path: &Path) -> Result<LoadedTrack, AppError> {
    let load_err = |e: &dyn std::fmt::Display| {
        AppError::BackendLoad(format!("{}: {}", path.display(), e))
    };

    let file = File::open(path).map_err(|e| load_err(&e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let format_opts = FormatOptions {
        enable_gapless: true,
        ..Default::default()
    };
    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &MetadataOptions::default())
        .map_err(|e| load_err(&e))?;

    let reader = probed.format;
    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| load_err(&"no audio track"))?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let duration = track
        .codec_params
        .n_frames
        .map(|frames| frames as f64 / sample_rate.max(1) as f64)
        .unwrap_or(0.0);

    let decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| load_err(&e))?;

    Ok(LoadedTrack {
        reader,
        decoder,
        track_id,
        sample_rate,
        duration,
    })
}
