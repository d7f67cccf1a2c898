use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::{Engine, EngineState, Persister};
use crate::errors::AppError;
use crate::events::{EventBus, PlayerEvent};
use crate::library::artwork::{self, ArtworkContent};
use crate::library::models::Song;
use crate::library::{scanner, ScanReport};
use crate::playback::PlaybackStatus;
use crate::queue::PlayerLocation;

/// Walks `root` off the async runtime and merges the result under a short
/// write lock. The merged library is stored before `library_loaded` goes out.
async fn scan_into(
    state: Arc<RwLock<EngineState>>,
    events: EventBus,
    store: Option<Persister>,
    root: PathBuf,
) -> Result<ScanReport, AppError> {
    log::info!("[Scanner] Scanning {:?}", root);
    let outcome = tokio::task::spawn_blocking(move || scanner::scan_folder(&root)).await??;

    let (report, total) = {
        let mut state = state.write();
        let report = state.library.merge_scan(outcome);
        (report, state.library.len())
    };

    for warning in &report.warnings {
        log::warn!("[Scanner] {}", warning);
    }
    log::info!(
        "[Scanner] Scan finished: {} added, {} updated, {} skipped",
        report.added,
        report.updated,
        report.warnings.len()
    );
    if let Some(store) = &store {
        store.save_quietly(&state).await;
    }
    events.emit_lossy(PlayerEvent::LibraryLoaded { songs: total });
    Ok(report)
}

impl Engine {
    pub async fn get_library(&self) -> Vec<Song> {
        self.state.read().library.list().to_vec()
    }

    pub async fn get_song(&self, uuid: Uuid) -> Result<Song, AppError> {
        self.state.read().library.get(&uuid).cloned()
    }

    /// Scans `root` and waits for the result.
    pub async fn scan_library(&self, root: &Path) -> Result<ScanReport, AppError> {
        scan_into(
            self.state.clone(),
            self.events.clone(),
            self.store.clone(),
            root.to_path_buf(),
        )
        .await
    }

    /// Registers `root` as a library and scans it in the background.
    /// Completion is announced with `library_loaded`.
    pub async fn create_library(&self, root: &Path) -> Result<(), AppError> {
        if !root.is_dir() {
            return Err(AppError::FileSystem(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        {
            let mut config = self.config.write();
            config.add_library(root);
            if let Err(e) = config.save() {
                log::warn!("[Engine] Failed to save config: {}", e);
            }
        }

        let state = self.state.clone();
        let events = self.events.clone();
        let store = self.store.clone();
        let root = root.to_path_buf();
        self.track_task(tokio::spawn(async move {
            if let Err(e) = scan_into(state, events.clone(), store, root.clone()).await {
                log::error!("[Scanner] Scan of {:?} failed: {}", root, e);
                events.emit_lossy(PlayerEvent::PlaybackError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                });
            }
        }));
        Ok(())
    }

    /// Removes a song from the library. Without `cascade` a song that a
    /// playlist or the queue still points at is refused with `InUse`. With
    /// it, those references go first.
    pub async fn remove_song(&self, uuid: Uuid, cascade: bool) -> Result<(), AppError> {
        let (songs, playlists_changed, queue_changed) = {
            let mut guard = self.state.write();
            let EngineState {
                library,
                playlists,
                queue,
                player,
            } = &mut *guard;

            library.get(&uuid)?;
            let in_playlist = playlists.references(&uuid);
            let in_queue = queue.contains_song(&uuid);
            if !cascade && (in_playlist || in_queue) {
                return Err(AppError::InUse(uuid.to_string()));
            }

            playlists.strip_song(&uuid);
            let head_matches = queue.strip_song(&uuid);
            library.remove(&uuid)?;

            if head_matches {
                let was_loaded = player.now_playing().is_some_and(|e| e.song == uuid);
                let was_playing = player.status() == PlaybackStatus::Playing;
                queue.drop_head();
                if was_loaded && was_playing {
                    player.start_head(queue, library);
                } else if was_loaded {
                    player.stop();
                }
            }

            (library.len(), in_playlist, in_queue)
        };

        log::info!("[Engine] Removed song {}", uuid);
        self.persist_quietly().await;
        if queue_changed {
            self.events.emit_lossy(PlayerEvent::QueueUpdated);
        }
        if playlists_changed {
            self.emit_playlists();
        }
        self.events
            .emit_lossy(PlayerEvent::LibraryLoaded { songs });
        Ok(())
    }

    /// Removes `song` from wherever `location` says it was picked from: the
    /// library itself, or one playlist.
    pub async fn remove_from_lib_playlist(
        &self,
        song: Uuid,
        location: PlayerLocation,
    ) -> Result<(), AppError> {
        match location {
            PlayerLocation::Library => self.remove_song(song, false).await,
            PlayerLocation::Playlist(playlist) => {
                self.state.write().playlists.remove_song(&playlist, &song)?;
                self.persist_quietly().await;
                self.emit_playlists();
                Ok(())
            }
        }
    }

    pub async fn album_art(&self, song: Uuid) -> Result<ArtworkContent, AppError> {
        let song = self.get_song(song).await?;
        tokio::task::spawn_blocking(move || artwork::load_artwork(&song)).await?
    }

    /// Opens the song's artwork in the platform image viewer.
    pub async fn display_album_art(&self, song: Uuid) -> Result<(), AppError> {
        let content = self.album_art(song).await?;
        let path = tokio::task::spawn_blocking(move || artwork::open_in_viewer(song, &content))
            .await??;
        log::info!("[Engine] Opened album art {:?}", path);
        Ok(())
    }
}
