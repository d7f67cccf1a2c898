use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub uuid: Uuid,
    pub name: String,
    /// Song uuids in play order. Duplicates are allowed and entries may
    /// point at songs that no longer exist.
    pub tracks: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl PlaylistInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            tracks: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_tracks(name: impl Into<String>, tracks: Vec<Uuid>) -> Self {
        Self {
            tracks,
            ..Self::new(name)
        }
    }

    pub fn contains(&self, song: &Uuid) -> bool {
        self.tracks.contains(song)
    }
}
