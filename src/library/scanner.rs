use super::models::{AlbumArt, Song, Tag};
use super::normalize_location;
use crate::errors::AppError;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::ItemValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "wav", "ogg", "m4a", "aac", "wma", "aiff", "ape", "opus", "webm",
];

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// Songs read from disk plus the per-file failures that were skipped.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub songs: Vec<Song>,
    pub warnings: Vec<AppError>,
}

pub fn is_audio_file(path: &Path) -> bool {
    has_extension(path, AUDIO_EXTENSIONS)
}

pub fn is_image_file(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn mime_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let mime = match ext.as_str() {
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "ogg" | "opus" => "audio/ogg",
        "m4a" | "aac" => "audio/mp4",
        "wma" => "audio/x-ms-wma",
        "aiff" => "audio/aiff",
        "ape" => "audio/ape",
        "webm" => "audio/webm",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime)
}

fn tag_for_key(key: &ItemKey) -> Tag {
    match key {
        ItemKey::TrackTitle => Tag::Title,
        ItemKey::AlbumTitle => Tag::Album,
        ItemKey::TrackArtist => Tag::Artist,
        ItemKey::AlbumArtist => Tag::AlbumArtist,
        ItemKey::Genre => Tag::Genre,
        ItemKey::Comment => Tag::Comment,
        ItemKey::TrackNumber => Tag::Track,
        ItemKey::DiscNumber => Tag::Disk,
        ItemKey::Unknown(name) => Tag::Key(name.clone()),
        other => Tag::Key(format!("{:?}", other)),
    }
}

/// Reads tags, duration and embedded art of a single file. External art is
/// not looked up here, see [`scan_folder`] and [`read_song`].
fn read_tags(path: &Path) -> Result<Song, AppError> {
    let scan_err = |reason: String| AppError::ScanIo {
        path: path.display().to_string(),
        reason,
    };

    let tagged_file = Probe::open(path)
        .and_then(|p| p.read())
        .map_err(|e| scan_err(e.to_string()))?;

    let duration = tagged_file.properties().duration().as_secs_f64();
    let mut song = Song::new(normalize_location(path), duration);
    song.format = mime_for_extension(path).map(str::to_string);

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    if let Some(tag) = tag {
        for item in tag.items() {
            let value = match item.value() {
                ItemValue::Text(text) | ItemValue::Locator(text) => text.clone(),
                ItemValue::Binary(_) => continue,
            };
            song.tags.entry(tag_for_key(item.key())).or_insert(value);
        }
        song.album_art = (0..tag.pictures().len()).map(AlbumArt::Embedded).collect();
    }

    Ok(song)
}

/// Image files sitting in the same directory as `audio_path`.
pub fn find_external_images(audio_path: &Path) -> Vec<PathBuf> {
    let Some(dir) = audio_path.parent() else {
        return Vec::new();
    };

    let mut images: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_image_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    images.sort();
    images
}

/// Reads one file into a fresh [`Song`], including sibling cover images.
pub fn read_song(path: &Path) -> Result<Song, AppError> {
    let mut song = read_tags(path)?;
    song.album_art.extend(
        find_external_images(path)
            .into_iter()
            .map(AlbumArt::External),
    );
    Ok(song)
}

/// Walks `root` and reads every recognised audio file. Unreadable files end
/// up in `warnings`, only a missing root is an error.
pub fn scan_folder(root: &Path) -> Result<ScanOutcome, AppError> {
    if !root.is_dir() {
        return Err(AppError::FileSystem(format!(
            "Library root is not a directory: {}",
            root.display()
        )));
    }

    log::info!("[Scanner] Scanning {:?}", root);

    let mut outcome = ScanOutcome::default();
    let mut images_by_dir: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                log::warn!("[Scanner] Skipping {}: {}", path, e);
                outcome.warnings.push(AppError::ScanIo {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || !is_audio_file(path) {
            continue;
        }

        match read_tags(path) {
            Ok(mut song) => {
                if let Some(dir) = path.parent() {
                    let images = images_by_dir
                        .entry(dir.to_path_buf())
                        .or_insert_with(|| find_external_images(path));
                    song.album_art
                        .extend(images.iter().cloned().map(AlbumArt::External));
                }
                outcome.songs.push(song);
            }
            Err(e) => {
                log::warn!("[Scanner] {}", e);
                outcome.warnings.push(e);
            }
        }
    }

    log::info!(
        "[Scanner] Finished {:?}: {} songs, {} warnings",
        root,
        outcome.songs.len(),
        outcome.warnings.len()
    );

    Ok(outcome)
}
