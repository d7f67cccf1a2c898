use uuid::Uuid;

use super::validate_entry;
use crate::engine::{Engine, EngineState};
use crate::errors::AppError;
use crate::events::PlayerEvent;
use crate::library::models::{BannedType, Song};
use crate::queue::{PlayerLocation, QueueEntry};

/// Songs after `song` in the place it was picked from, in library or
/// playlist order. Songs banned outright are left out.
fn songs_after(state: &EngineState, song: &Uuid, location: &PlayerLocation) -> Vec<QueueEntry> {
    let candidates: Vec<Uuid> = match location {
        PlayerLocation::Library => state.library.list().iter().map(|s| s.uuid).collect(),
        PlayerLocation::Playlist(playlist) => match state.playlists.get(playlist, &state.library) {
            Ok(songs) => songs.iter().map(|s| s.uuid).collect(),
            Err(_) => Vec::new(),
        },
    };

    candidates
        .iter()
        .skip_while(|uuid| *uuid != song)
        .skip(1)
        .filter(|uuid| {
            state
                .library
                .get(uuid)
                .is_ok_and(|s| s.banned != Some(BannedType::All))
        })
        .map(|uuid| QueueEntry::new(*uuid, *location))
        .collect()
}

impl Engine {
    /// The queue as songs. Index 0 is the entry now playing.
    pub async fn get_queue(&self) -> Vec<(Song, PlayerLocation)> {
        let state = self.state.read();
        state
            .queue
            .entries()
            .iter()
            .filter_map(|entry| {
                state
                    .library
                    .get(&entry.song)
                    .ok()
                    .map(|song| (song.clone(), entry.location))
            })
            .collect()
    }

    /// Runs a queue mutation under the write lock and announces the result.
    fn mutate_queue<R>(
        &self,
        f: impl FnOnce(&mut EngineState) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let result = f(&mut self.state.write())?;
        self.events.emit_lossy(PlayerEvent::QueueUpdated);
        Ok(result)
    }

    pub async fn add_song_to_queue(
        &self,
        song: Uuid,
        location: PlayerLocation,
    ) -> Result<(), AppError> {
        self.mutate_queue(|state| {
            validate_entry(state, &song, &location)?;
            state.queue.enqueue(QueueEntry::new(song, location));
            Ok(())
        })
    }

    /// Makes `song` the head and starts it right away. The songs that follow
    /// it in `location` replace the up-next section.
    pub async fn play_now(&self, song: Uuid, location: PlayerLocation) -> Result<(), AppError> {
        let limit = self.config.read().up_next_limit;
        self.mutate_queue(|state| {
            validate_entry(state, &song, &location)?;
            let up_next = songs_after(state, &song, &location);
            let EngineState {
                library,
                queue,
                player,
                ..
            } = state;
            queue.play_now(QueueEntry::new(song, location));
            queue.fill_up_next(up_next, limit);
            player.start_head(queue, library);
            Ok(())
        })
    }

    pub async fn play_next_queue(
        &self,
        song: Uuid,
        location: PlayerLocation,
    ) -> Result<(), AppError> {
        self.mutate_queue(|state| {
            validate_entry(state, &song, &location)?;
            state.queue.play_next(QueueEntry::new(song, location));
            Ok(())
        })
    }

    /// `index` counts from 1, the entry after the one playing.
    pub async fn remove_from_queue(&self, index: usize) -> Result<(), AppError> {
        self.mutate_queue(|state| state.queue.remove(index).map(|_| ()))
    }

    /// Drops everything upcoming. A track that is loaded keeps playing.
    pub async fn clear_queue(&self) -> Result<(), AppError> {
        self.mutate_queue(|state| {
            let keep_head = state.player.is_loaded();
            state.queue.clear(keep_head);
            Ok(())
        })
    }

    /// Jumps to the entry at `index` and starts it.
    pub async fn queue_move_to(&self, index: usize) -> Result<(), AppError> {
        self.mutate_queue(|state| {
            let EngineState {
                library,
                queue,
                player,
                ..
            } = state;
            queue.move_to(index)?;
            player.start_head(queue, library);
            Ok(())
        })
    }

    pub async fn queue_shuffle(&self, enabled: bool) -> Result<(), AppError> {
        log::info!("[Queue] Shuffle {}", if enabled { "on" } else { "off" });
        self.mutate_queue(|state| {
            state.queue.set_shuffle(enabled);
            Ok(())
        })
    }
}
