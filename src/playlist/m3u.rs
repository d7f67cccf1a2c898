use crate::errors::AppError;
use crate::library::models::Song;
use crate::library::scanner;
use std::fs;
use std::path::{Path, PathBuf};

/// One line of an M3U file resolved to a local path. `song` holds freshly
/// read metadata when the file exists and could be parsed.
#[derive(Debug)]
pub struct PlaylistEntry {
    pub location: PathBuf,
    pub song: Option<Song>,
}

#[derive(Debug)]
pub struct ParsedPlaylist {
    pub name: String,
    pub entries: Vec<PlaylistEntry>,
}

fn decode_file_uri(uri: &str) -> Option<PathBuf> {
    let rest = uri.strip_prefix("file://")?;
    // file:///C:/x on windows, file:///home/x elsewhere
    let rest = rest.strip_prefix("localhost").unwrap_or(rest);
    let decoded = urlencoding::decode(rest).ok()?.into_owned();
    #[cfg(target_os = "windows")]
    let decoded = decoded.trim_start_matches('/').to_string();
    Some(PathBuf::from(decoded))
}

/// Turns the raw M3U entries into paths. Comments and blank lines are
/// skipped, relative entries resolve against the playlist's directory.
pub fn parse_entries(content: &str, base_dir: &Path) -> Vec<PathBuf> {
    content
        .lines()
        .map(|line| line.trim().trim_start_matches('\u{feff}'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            if line.starts_with("file://") {
                return decode_file_uri(line);
            }
            if line.contains("://") {
                log::warn!("[Playlist] Remote entry not supported: {}", line);
                return None;
            }
            let path = PathBuf::from(line);
            Some(if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            })
        })
        .collect()
}

/// Reads an M3U/M3U8 file and the metadata of every entry it references.
pub fn read_playlist(path: &Path) -> Result<ParsedPlaylist, AppError> {
    let content = fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Imported Playlist")
        .to_string();

    let entries = parse_entries(&content, base_dir)
        .into_iter()
        .map(|location| {
            let song = if location.is_file() {
                match scanner::read_song(&location) {
                    Ok(song) => Some(song),
                    Err(e) => {
                        log::warn!("[Playlist] {}", e);
                        None
                    }
                }
            } else {
                None
            };
            PlaylistEntry { location, song }
        })
        .collect();

    Ok(ParsedPlaylist { name, entries })
}

/// Writes an extended M3U listing `songs` by their primary location.
pub fn write_playlist(path: &Path, songs: &[Song]) -> Result<(), AppError> {
    let mut out = String::from("#EXTM3U\n");
    for song in songs {
        let Some(location) = song.primary_location() else {
            continue;
        };
        out.push_str(&format!(
            "#EXTINF:{},{} - {}\n{}\n",
            song.duration.round() as i64,
            song.artist(),
            song.title(),
            location.display()
        ));
    }
    fs::write(path, out)?;
    Ok(())
}
