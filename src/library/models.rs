use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A metadata key. Well-known keys get their own variant, anything else a
/// tag reader reports is kept verbatim under `Key`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Tag {
    Title,
    Album,
    Artist,
    AlbumArtist,
    Genre,
    Comment,
    Track,
    Disk,
    Key(String),
}

impl From<String> for Tag {
    fn from(s: String) -> Self {
        match s.as_str() {
            "TrackTitle" => Tag::Title,
            "AlbumTitle" => Tag::Album,
            "TrackArtist" => Tag::Artist,
            "AlbumArtist" => Tag::AlbumArtist,
            "Genre" => Tag::Genre,
            "Comment" => Tag::Comment,
            "TrackNumber" => Tag::Track,
            "DiscNumber" => Tag::Disk,
            _ => Tag::Key(s),
        }
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.to_string()
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tag::Title => write!(f, "TrackTitle"),
            Tag::Album => write!(f, "AlbumTitle"),
            Tag::Artist => write!(f, "TrackArtist"),
            Tag::AlbumArtist => write!(f, "AlbumArtist"),
            Tag::Genre => write!(f, "Genre"),
            Tag::Comment => write!(f, "Comment"),
            Tag::Track => write!(f, "TrackNumber"),
            Tag::Disk => write!(f, "DiscNumber"),
            Tag::Key(key) => write!(f, "{}", key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannedType {
    /// Shuffle never draws it. It still plays when chosen explicitly or when
    /// nothing else is left to draw.
    Shuffle,
    /// Like `Shuffle`, and also kept out of up-next fills.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum AlbumArt {
    /// Index into the pictures stored in the song's primary tag.
    Embedded(usize),
    External(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub uuid: Uuid,
    /// Source locations, the first one is what the backend loads.
    pub location: Vec<PathBuf>,
    pub tags: BTreeMap<Tag, String>,
    /// Seconds.
    pub duration: f64,
    pub format: Option<String>,

    // Analytics
    #[serde(default)]
    pub plays: u32,
    #[serde(default)]
    pub skips: u32,
    #[serde(default)]
    pub play_time: f64,
    #[serde(default)]
    pub favorited: bool,
    pub rating: Option<u8>,
    pub banned: Option<BannedType>,

    #[serde(default)]
    pub album_art: Vec<AlbumArt>,

    pub last_played: Option<DateTime<Utc>>,
    pub date_added: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
}

impl Song {
    pub fn new(location: PathBuf, duration: f64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            location: vec![location],
            tags: BTreeMap::new(),
            duration,
            format: None,
            plays: 0,
            skips: 0,
            play_time: 0.0,
            favorited: false,
            rating: None,
            banned: None,
            album_art: Vec::new(),
            last_played: None,
            date_added: Some(Utc::now()),
            date_modified: None,
        }
    }

    pub fn primary_location(&self) -> Option<&Path> {
        self.location.first().map(PathBuf::as_path)
    }

    pub fn get_tag(&self, tag: &Tag) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    pub fn set_tag(&mut self, tag: Tag, value: impl Into<String>) {
        self.tags.insert(tag, value.into());
    }

    /// Title tag, falling back to the file stem.
    pub fn title(&self) -> String {
        self.get_tag(&Tag::Title)
            .map(str::to_string)
            .or_else(|| {
                self.primary_location()
                    .and_then(|p| p.file_stem())
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Unknown Title".to_string())
    }

    pub fn artist(&self) -> String {
        self.get_tag(&Tag::Artist)
            .or_else(|| self.get_tag(&Tag::AlbumArtist))
            .unwrap_or("Unknown Artist")
            .to_string()
    }

    /// Replaces everything a rescan can observe, keeping identity and
    /// listening history.
    pub fn refresh_from(&mut self, scanned: Song) {
        self.tags = scanned.tags;
        self.duration = scanned.duration;
        self.format = scanned.format;
        self.album_art = scanned.album_art;
        self.date_modified = Some(Utc::now());
        for location in scanned.location {
            if !self.location.contains(&location) {
                self.location.push(location);
            }
        }
    }
}
