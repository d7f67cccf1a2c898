use std::path::Path;
use uuid::Uuid;

use crate::engine::Engine;
use crate::errors::AppError;
use crate::events::PlayerEvent;
use crate::library::models::Song;
use crate::playlist::{m3u, PlaylistInfo};

impl Engine {
    pub(crate) fn emit_playlists(&self) {
        let playlists = self.state.read().playlists.list().to_vec();
        self.events
            .emit_lossy(PlayerEvent::PlaylistsGotten { playlists });
    }

    /// Returns every playlist and republishes the list as
    /// `playlists_gotten`.
    pub async fn get_playlists(&self) -> Vec<PlaylistInfo> {
        let playlists = self.state.read().playlists.list().to_vec();
        self.events.emit_lossy(PlayerEvent::PlaylistsGotten {
            playlists: playlists.clone(),
        });
        playlists
    }

    /// Songs of a playlist in order. References to songs that have left the
    /// library are skipped.
    pub async fn get_playlist(&self, uuid: Uuid) -> Result<Vec<Song>, AppError> {
        let state = self.state.read();
        state.playlists.get(&uuid, &state.library)
    }

    pub async fn create_playlist(&self, name: &str) -> Result<PlaylistInfo, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "Playlist name cannot be empty".to_string(),
            ));
        }
        let playlist = self.state.write().playlists.create(name);
        log::info!("[Playlist] Created '{}' ({})", playlist.name, playlist.uuid);
        self.persist_quietly().await;
        self.emit_playlists();
        Ok(playlist)
    }

    /// Reads an M3U file. Entries outside the library are scanned in,
    /// entries that cannot be read are dropped.
    pub async fn import_playlist(&self, path: &Path) -> Result<PlaylistInfo, AppError> {
        let file = path.to_path_buf();
        let parsed = tokio::task::spawn_blocking(move || m3u::read_playlist(&file)).await??;

        let (playlist, songs) = {
            let mut guard = self.state.write();
            let state = &mut *guard;
            let playlist = state.playlists.import(parsed, &mut state.library);
            (playlist, state.library.len())
        };

        log::info!(
            "[Playlist] Imported '{}' with {} tracks from {:?}",
            playlist.name,
            playlist.tracks.len(),
            path
        );
        self.persist_quietly().await;
        self.events.emit_lossy(PlayerEvent::LibraryLoaded { songs });
        self.emit_playlists();
        Ok(playlist)
    }

    pub async fn export_playlist(&self, uuid: Uuid, path: &Path) -> Result<(), AppError> {
        let songs = self.get_playlist(uuid).await?;
        let target = path.to_path_buf();
        tokio::task::spawn_blocking(move || m3u::write_playlist(&target, &songs)).await??;
        log::info!("[Playlist] Exported {} to {:?}", uuid, path);
        Ok(())
    }

    /// Queue entries that came from the playlist stay queued.
    pub async fn delete_playlist(&self, uuid: Uuid) -> Result<(), AppError> {
        let removed = self.state.write().playlists.delete(&uuid)?;
        log::info!("[Playlist] Deleted '{}'", removed.name);
        self.persist_quietly().await;
        self.emit_playlists();
        Ok(())
    }

    pub async fn add_song_to_playlist(&self, playlist: Uuid, song: Uuid) -> Result<(), AppError> {
        {
            let mut guard = self.state.write();
            let state = &mut *guard;
            state.playlists.add_song(&playlist, &song, &state.library)?;
        }
        self.persist_quietly().await;
        self.emit_playlists();
        Ok(())
    }
}
