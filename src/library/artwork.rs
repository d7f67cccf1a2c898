use super::models::{AlbumArt, Song};
use super::scanner::mime_for_extension;
use crate::errors::AppError;
use base64::{engine::general_purpose, Engine as _};
use lofty::picture::MimeType;
use lofty::prelude::*;
use lofty::probe::Probe;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtworkContent {
    pub mime: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl ArtworkContent {
    pub fn to_data_url(&self) -> String {
        let b64 = general_purpose::STANDARD.encode(&self.data);
        format!("data:{};base64,{}", self.mime, b64)
    }

    fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            "image/tiff" => "tiff",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

fn mime_str(mime: Option<&MimeType>) -> &'static str {
    match mime.unwrap_or(&MimeType::Jpeg) {
        MimeType::Png => "image/png",
        MimeType::Jpeg => "image/jpeg",
        MimeType::Tiff => "image/tiff",
        MimeType::Bmp => "image/bmp",
        MimeType::Gif => "image/gif",
        _ => "application/octet-stream",
    }
}

fn read_embedded(path: &Path, index: usize) -> Result<ArtworkContent, AppError> {
    let tagged_file = Probe::open(path)
        .and_then(|p| p.read())
        .map_err(|e| AppError::ScanIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let picture = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
        .and_then(|tag| tag.pictures().get(index))
        .ok_or_else(|| AppError::not_found("embedded picture", index))?;

    Ok(ArtworkContent {
        mime: mime_str(picture.mime_type()).to_string(),
        data: picture.data().to_vec(),
    })
}

fn read_external(path: &PathBuf) -> Result<ArtworkContent, AppError> {
    let data = fs::read(path)?;
    Ok(ArtworkContent {
        mime: mime_for_extension(path)
            .unwrap_or("application/octet-stream")
            .to_string(),
        data,
    })
}

/// First piece of art for `song` that can actually be read. Embedded pictures
/// win over files next to the track.
pub fn load_artwork(song: &Song) -> Result<ArtworkContent, AppError> {
    for art in &song.album_art {
        let loaded = match art {
            AlbumArt::Embedded(index) => match song.primary_location() {
                Some(path) => read_embedded(path, *index),
                None => continue,
            },
            AlbumArt::External(path) => read_external(path),
        };

        match loaded {
            Ok(content) => return Ok(content),
            Err(e) => log::warn!("[Artwork] Skipping art for {}: {}", song.uuid, e),
        }
    }

    Err(AppError::not_found("album art for song", song.uuid))
}

/// Writes the art to the temp dir and hands it to the platform's viewer.
pub fn open_in_viewer(uuid: Uuid, content: &ArtworkContent) -> Result<PathBuf, AppError> {
    let path = std::env::temp_dir().join(format!("cadence-art-{}.{}", uuid, content.extension()));
    fs::write(&path, &content.data)?;

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("explorer")
            .arg(&path)
            .spawn()
            .map_err(|e| AppError::FileSystem(e.to_string()))?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(&path)
            .spawn()
            .map_err(|e| AppError::FileSystem(e.to_string()))?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(&path)
            .spawn()
            .map_err(|e| AppError::FileSystem(e.to_string()))?;
    }

    Ok(path)
}
