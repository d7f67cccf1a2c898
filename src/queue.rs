use crate::errors::AppError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// How many finished entries are kept around for `previous()`.
pub const PLAYED_HISTORY_LIMIT: usize = 50;

/// Default cap on how many songs a `play_now` puts in the up-next section.
pub const UP_NEXT_LIMIT: usize = 50;

/// Where a queued song was picked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "uuid", rename_all = "lowercase")]
pub enum PlayerLocation {
    Library,
    Playlist(Uuid),
}

/// Why an entry sits in the queue. Upcoming entries are always ordered
/// `PlayNext`, then `Queued`, then `UpNext`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Added with `play_next`. Plays before anything else, shuffle or not.
    PlayNext,
    #[default]
    Queued,
    /// Filled in from the library or playlist `play_now` was called from.
    UpNext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub song: Uuid,
    pub location: PlayerLocation,
    #[serde(default)]
    pub kind: EntryKind,
}

impl QueueEntry {
    pub fn new(song: Uuid, location: PlayerLocation) -> Self {
        Self {
            song,
            location,
            kind: EntryKind::Queued,
        }
    }

    fn with_kind(mut self, kind: EntryKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Ordered play queue. Slot 0 is the entry the transport plays, the rest is
/// the upcoming list a UI shows. Public indices for `remove`/`move_to` start
/// at 1 and therefore line up with the storage index.
#[derive(Debug, Default)]
pub struct PlayQueue {
    entries: Vec<QueueEntry>,
    played: VecDeque<QueueEntry>,
    shuffle: bool,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn head(&self) -> Option<&QueueEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    pub fn played(&self) -> impl Iterator<Item = &QueueEntry> {
        self.played.iter()
    }

    /// Upcoming entries that came from an up-next fill.
    pub fn up_next(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries
            .iter()
            .skip(1)
            .filter(|e| e.kind == EntryKind::UpNext)
    }

    pub fn contains_song(&self, song: &Uuid) -> bool {
        self.entries.iter().any(|e| e.song == *song)
    }

    fn push_played(&mut self, entry: QueueEntry) {
        self.played.push_back(entry);
        while self.played.len() > PLAYED_HISTORY_LIMIT {
            self.played.pop_front();
        }
    }

    fn check_index(&self, index: usize) -> Result<(), AppError> {
        if index == 0 || index >= self.entries.len() {
            return Err(AppError::OutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(())
    }

    /// Adds `entry` after the other user-queued entries, ahead of up-next.
    pub fn enqueue(&mut self, entry: QueueEntry) {
        let entry = entry.with_kind(EntryKind::Queued);
        let at = self
            .entries
            .iter()
            .skip(1)
            .position(|e| e.kind == EntryKind::UpNext)
            .map_or(self.entries.len(), |i| i + 1);
        self.entries.insert(at, entry);
    }

    /// Puts `entry` in slot 0. The entry it replaces goes to the history.
    pub fn play_now(&mut self, entry: QueueEntry) {
        if self.entries.is_empty() {
            self.entries.push(entry);
        } else {
            let old = std::mem::replace(&mut self.entries[0], entry);
            self.push_played(old);
        }
    }

    pub fn play_next(&mut self, entry: QueueEntry) {
        let entry = entry.with_kind(EntryKind::PlayNext);
        if self.entries.is_empty() {
            self.entries.push(entry);
        } else {
            self.entries.insert(1, entry);
        }
    }

    /// Replaces the up-next section with `entries`, at most `limit` of them.
    /// User-queued entries are left alone.
    pub fn fill_up_next(&mut self, entries: impl IntoIterator<Item = QueueEntry>, limit: usize) {
        let mut index = 0;
        self.entries.retain(|e| {
            let keep = index == 0 || e.kind != EntryKind::UpNext;
            index += 1;
            keep
        });
        self.entries.extend(
            entries
                .into_iter()
                .take(limit)
                .map(|e| e.with_kind(EntryKind::UpNext)),
        );
    }

    pub fn remove(&mut self, index: usize) -> Result<QueueEntry, AppError> {
        self.check_index(index)?;
        Ok(self.entries.remove(index))
    }

    /// Promotes the entry at `index` to slot 0, keeping the order of the rest.
    pub fn move_to(&mut self, index: usize) -> Result<(), AppError> {
        self.check_index(index)?;
        let entry = self.entries.remove(index);
        self.play_now(entry);
        Ok(())
    }

    pub fn advance(&mut self) -> Option<&QueueEntry> {
        self.advance_skipping(|_| false)
    }

    /// Finishes the head and promotes the next entry. With shuffle on the
    /// next entry is drawn from the remaining tail, so every entry comes up
    /// once before anything repeats. A waiting `PlayNext` entry is never
    /// shuffled past. User-queued entries are drawn before up-next ones.
    /// Entries for which `banned` holds are not drawn and play in order once
    /// nothing else in their section is left.
    pub fn advance_skipping(
        &mut self,
        banned: impl Fn(&QueueEntry) -> bool,
    ) -> Option<&QueueEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let finished = self.entries.remove(0);
        self.push_played(finished);

        if self.shuffle {
            if let Some(pick) = self.shuffle_pick(banned) {
                let entry = self.entries.remove(pick);
                self.entries.insert(0, entry);
            }
        }

        self.entries.first()
    }

    fn shuffle_pick(&self, banned: impl Fn(&QueueEntry) -> bool) -> Option<usize> {
        let kind = self.entries.first()?.kind;
        if kind == EntryKind::PlayNext {
            return None;
        }
        let candidates: Vec<usize> = self
            .entries
            .iter()
            .take_while(|e| e.kind == kind)
            .enumerate()
            .filter(|(_, e)| !banned(e))
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[rand::rng().random_range(0..candidates.len())])
    }

    /// Brings back the most recently finished entry as the head.
    pub fn previous(&mut self) -> Option<&QueueEntry> {
        let entry = self.played.pop_back()?;
        self.entries.insert(0, entry);
        self.entries.first()
    }

    /// Drops the upcoming entries, up-next included. The head survives when
    /// `keep_head` is set so audio that is already loaded can finish.
    pub fn clear(&mut self, keep_head: bool) {
        if keep_head {
            self.entries.truncate(1);
        } else {
            self.entries.clear();
        }
    }

    /// Removes the head without recording it in the history.
    pub fn drop_head(&mut self) -> Option<QueueEntry> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        self.shuffle = enabled;
    }

    /// Removes `song` from the upcoming entries and the history. The head is
    /// left alone, the return value says whether it also matches.
    pub fn strip_song(&mut self, song: &Uuid) -> bool {
        let head_matches = self.head().is_some_and(|e| e.song == *song);
        let mut index = 0;
        self.entries.retain(|e| {
            let keep = index == 0 || e.song != *song;
            index += 1;
            keep
        });
        self.played.retain(|e| e.song != *song);
        head_matches
    }
}
