pub mod artwork;
pub mod models;
pub mod scanner;

use crate::errors::AppError;
use chrono::Utc;
use models::Song;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Canonical form of a file location, used as the identity key for songs
/// found on disk. Falls back to an absolute path when the file is gone.
pub fn normalize_location(path: &Path) -> PathBuf {
    match std::fs::canonicalize(path) {
        Ok(canonical) => canonical,
        Err(_) if path.is_absolute() => path.to_path_buf(),
        Err(_) => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ScanReport {
    pub added: usize,
    pub updated: usize,
    pub warnings: Vec<AppError>,
}

/// In-memory song catalog. Iteration follows insertion order.
#[derive(Debug, Default)]
pub struct LibraryIndex {
    songs: Vec<Song>,
    by_uuid: HashMap<Uuid, usize>,
    by_location: HashMap<PathBuf, Uuid>,
}

impl LibraryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_songs(songs: Vec<Song>) -> Self {
        let mut index = Self::new();
        for song in songs {
            index.insert(song);
        }
        index
    }

    fn insert(&mut self, song: Song) -> Uuid {
        let uuid = song.uuid;
        for location in &song.location {
            self.by_location.insert(location.clone(), uuid);
        }
        self.by_uuid.insert(uuid, self.songs.len());
        self.songs.push(song);
        uuid
    }

    fn reindex(&mut self) {
        self.by_uuid.clear();
        self.by_location.clear();
        for (i, song) in self.songs.iter().enumerate() {
            self.by_uuid.insert(song.uuid, i);
            for location in &song.location {
                self.by_location.insert(location.clone(), song.uuid);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.by_uuid.contains_key(uuid)
    }

    pub fn get(&self, uuid: &Uuid) -> Result<&Song, AppError> {
        self.by_uuid
            .get(uuid)
            .map(|&i| &self.songs[i])
            .ok_or_else(|| AppError::not_found("song", uuid))
    }

    pub fn get_mut(&mut self, uuid: &Uuid) -> Result<&mut Song, AppError> {
        match self.by_uuid.get(uuid) {
            Some(&i) => Ok(&mut self.songs[i]),
            None => Err(AppError::not_found("song", uuid)),
        }
    }

    pub fn list(&self) -> &[Song] {
        &self.songs
    }

    pub fn find_by_location(&self, path: &Path) -> Option<&Song> {
        let uuid = self
            .by_location
            .get(path)
            .or_else(|| self.by_location.get(&normalize_location(path)))?;
        self.get(uuid).ok()
    }

    /// Adds `song`, or refreshes the metadata of the song already living at
    /// the same location. Returns the uuid that ends up in the index and
    /// whether it was newly added.
    pub fn upsert(&mut self, song: Song) -> (Uuid, bool) {
        let existing = song
            .location
            .iter()
            .find_map(|loc| self.by_location.get(loc).copied());

        match existing.and_then(|uuid| self.by_uuid.get(&uuid).copied()) {
            Some(i) => {
                self.songs[i].refresh_from(song);
                let uuid = self.songs[i].uuid;
                for location in self.songs[i].location.clone() {
                    self.by_location.insert(location, uuid);
                }
                (uuid, false)
            }
            None => (self.insert(song), true),
        }
    }

    /// Merges the result of a folder walk.
    pub fn merge_scan(&mut self, outcome: scanner::ScanOutcome) -> ScanReport {
        let mut report = ScanReport {
            warnings: outcome.warnings,
            ..Default::default()
        };
        for song in outcome.songs {
            if self.upsert(song).1 {
                report.added += 1;
            } else {
                report.updated += 1;
            }
        }
        report
    }

    /// Scans `root` synchronously. The engine splits this into a lock-free
    /// walk and a locked merge, this is the single-threaded shortcut.
    pub fn scan(&mut self, root: &Path) -> Result<ScanReport, AppError> {
        let outcome = scanner::scan_folder(root)?;
        Ok(self.merge_scan(outcome))
    }

    /// Indexes a single file, reusing the existing entry if it is known.
    pub fn add_file(&mut self, path: &Path) -> Result<Uuid, AppError> {
        if let Some(song) = self.find_by_location(path) {
            return Ok(song.uuid);
        }
        let song = scanner::read_song(path)?;
        Ok(self.upsert(song).0)
    }

    /// Removes the song from the index only. Reference checks against
    /// playlists and the queue belong to the caller.
    pub fn remove(&mut self, uuid: &Uuid) -> Result<Song, AppError> {
        let i = *self
            .by_uuid
            .get(uuid)
            .ok_or_else(|| AppError::not_found("song", uuid))?;
        let song = self.songs.remove(i);
        self.reindex();
        Ok(song)
    }

    pub fn record_play(&mut self, uuid: &Uuid, seconds: f64) -> Result<(), AppError> {
        let song = self.get_mut(uuid)?;
        song.plays += 1;
        song.play_time += seconds.max(0.0);
        song.last_played = Some(Utc::now());
        Ok(())
    }

    pub fn record_skip(&mut self, uuid: &Uuid) -> Result<(), AppError> {
        let song = self.get_mut(uuid)?;
        song.skips += 1;
        Ok(())
    }
}
