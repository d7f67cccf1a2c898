use super::m3u::ParsedPlaylist;
use super::models::PlaylistInfo;
use crate::errors::AppError;
use crate::library::models::Song;
use crate::library::LibraryIndex;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct PlaylistManager {
    playlists: Vec<PlaylistInfo>,
}

impl PlaylistManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_playlists(playlists: Vec<PlaylistInfo>) -> Self {
        Self { playlists }
    }

    pub fn list(&self) -> &[PlaylistInfo] {
        &self.playlists
    }

    pub fn info(&self, uuid: &Uuid) -> Result<&PlaylistInfo, AppError> {
        self.playlists
            .iter()
            .find(|p| p.uuid == *uuid)
            .ok_or_else(|| AppError::not_found("playlist", uuid))
    }

    fn info_mut(&mut self, uuid: &Uuid) -> Result<&mut PlaylistInfo, AppError> {
        self.playlists
            .iter_mut()
            .find(|p| p.uuid == *uuid)
            .ok_or_else(|| AppError::not_found("playlist", uuid))
    }

    pub fn create(&mut self, name: impl Into<String>) -> PlaylistInfo {
        let playlist = PlaylistInfo::new(name);
        self.playlists.push(playlist.clone());
        playlist
    }

    /// Stores a parsed playlist. Entries already in the library keep their
    /// song, readable new files are added, everything else is dropped.
    pub fn import(&mut self, parsed: ParsedPlaylist, library: &mut LibraryIndex) -> PlaylistInfo {
        let mut tracks = Vec::with_capacity(parsed.entries.len());

        for entry in parsed.entries {
            if let Some(song) = library.find_by_location(&entry.location) {
                tracks.push(song.uuid);
                continue;
            }
            match entry.song {
                Some(song) => tracks.push(library.upsert(song).0),
                None => log::warn!(
                    "[Playlist] Skipping unresolvable entry {:?} in {}",
                    entry.location,
                    parsed.name
                ),
            }
        }

        let playlist = PlaylistInfo::with_tracks(parsed.name, tracks);
        log::info!(
            "[Playlist] Imported '{}' with {} tracks",
            playlist.name,
            playlist.tracks.len()
        );
        self.playlists.push(playlist.clone());
        playlist
    }

    /// Songs of the playlist resolved against the library. References to
    /// removed songs are left out.
    pub fn get(&self, uuid: &Uuid, library: &LibraryIndex) -> Result<Vec<Song>, AppError> {
        let playlist = self.info(uuid)?;
        Ok(playlist
            .tracks
            .iter()
            .filter_map(|id| library.get(id).ok().cloned())
            .collect())
    }

    pub fn add_song(
        &mut self,
        playlist: &Uuid,
        song: &Uuid,
        library: &LibraryIndex,
    ) -> Result<(), AppError> {
        library.get(song)?;
        self.info_mut(playlist)?.tracks.push(*song);
        Ok(())
    }

    /// Removes the first occurrence of `song`.
    pub fn remove_song(&mut self, playlist: &Uuid, song: &Uuid) -> Result<(), AppError> {
        let info = self.info_mut(playlist)?;
        let position = info
            .tracks
            .iter()
            .position(|id| id == song)
            .ok_or_else(|| AppError::not_found("song in playlist", song))?;
        info.tracks.remove(position);
        Ok(())
    }

    pub fn delete(&mut self, uuid: &Uuid) -> Result<PlaylistInfo, AppError> {
        let position = self
            .playlists
            .iter()
            .position(|p| p.uuid == *uuid)
            .ok_or_else(|| AppError::not_found("playlist", uuid))?;
        Ok(self.playlists.remove(position))
    }

    pub fn references(&self, song: &Uuid) -> bool {
        self.playlists.iter().any(|p| p.contains(song))
    }

    /// Drops every reference to `song` from every playlist.
    pub fn strip_song(&mut self, song: &Uuid) {
        for playlist in &mut self.playlists {
            playlist.tracks.retain(|id| id != song);
        }
    }
}
