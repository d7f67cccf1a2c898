use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::audio::BackendKind;
use crate::errors::AppError;
use crate::queue::UP_NEXT_LIMIT;

pub const APP_NAME: &str = "cadence";
pub const DEFAULT_POSITION_INTERVAL_MS: u64 = 250;
/// Listening time after which a listen is submitted, capped at half the
/// track length.
pub const DEFAULT_SCROBBLE_DWELL_SECS: u64 = 240;
pub const LISTENBRAINZ_API_URL: &str = "https://api.listenbrainz.org";
pub const LASTFM_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn get_config_file_path() -> PathBuf {
    get_config_dir().join("config.json")
}

pub fn get_database_path() -> PathBuf {
    get_config_dir().join("library.db")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryRoot {
    pub uuid: Uuid,
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastFmConfig {
    pub api_key: String,
    pub api_secret: String,
    /// Result of the out-of-band auth.getSession exchange.
    pub session_key: Option<String>,
    #[serde(default = "default_lastfm_url")]
    pub api_url: String,
}

fn default_lastfm_url() -> String {
    LASTFM_API_URL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigConnections {
    pub listenbrainz_token: Option<String>,
    pub listenbrainz_api_url: String,
    pub last_fm: Option<LastFmConfig>,
    pub scrobble_dwell_secs: u64,
}

impl Default for ConfigConnections {
    fn default() -> Self {
        Self {
            listenbrainz_token: None,
            listenbrainz_api_url: LISTENBRAINZ_API_URL.to_string(),
            last_fm: None,
            scrobble_dwell_secs: DEFAULT_SCROBBLE_DWELL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where this config lives. Not serialized.
    #[serde(skip)]
    pub path: PathBuf,
    pub libraries: Vec<LibraryRoot>,
    pub default_library: Option<Uuid>,
    pub volume: f32,
    pub backend: BackendKind,
    pub position_interval_ms: u64,
    /// Songs queued behind a `play_now` from the library or a playlist.
    pub up_next_limit: usize,
    /// SQLite file holding songs and playlists. `None` keeps everything in
    /// memory for the lifetime of the engine.
    pub database_path: Option<PathBuf>,
    pub connections: ConfigConnections,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: get_config_file_path(),
            libraries: Vec::new(),
            default_library: None,
            volume: 1.0,
            backend: BackendKind::default(),
            position_interval_ms: DEFAULT_POSITION_INTERVAL_MS,
            up_next_limit: UP_NEXT_LIMIT,
            database_path: Some(get_database_path()),
            connections: ConfigConnections::default(),
        }
    }
}

impl Config {
    /// A config that touches nothing on disk, useful for tests and
    /// throwaway sessions.
    pub fn ephemeral() -> Self {
        Self {
            path: PathBuf::new(),
            database_path: None,
            backend: BackendKind::Null,
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Invalid config {}: {}", path.display(), e)))?;
        config.path = path.to_path_buf();
        config.volume = config.volume.clamp(0.0, 1.0);
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when the file is missing.
    pub fn load_or_default(path: &Path) -> Result<Self, AppError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("[Config] No config at {:?}, using defaults", path);
            Ok(Self {
                path: path.to_path_buf(),
                ..Default::default()
            })
        }
    }

    /// Writes next to the target first and renames over it, so a crash
    /// never leaves a truncated config behind.
    pub fn save(&self) -> Result<(), AppError> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Registers a library root, reusing the entry if the path is known.
    /// The first root registered becomes the default.
    pub fn add_library(&mut self, path: &Path) -> Uuid {
        if let Some(existing) = self.libraries.iter().find(|l| l.path == path) {
            return existing.uuid;
        }
        let root = LibraryRoot {
            uuid: Uuid::new_v4(),
            name: path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("Library")
                .to_string(),
            path: path.to_path_buf(),
        };
        let uuid = root.uuid;
        self.libraries.push(root);
        if self.default_library.is_none() {
            self.default_library = Some(uuid);
        }
        uuid
    }

    pub fn default_library(&self) -> Option<&LibraryRoot> {
        let uuid = self.default_library?;
        self.libraries.iter().find(|l| l.uuid == uuid)
    }
}
