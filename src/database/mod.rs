use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::AppError;
use crate::library::models::Song;
use crate::playlist::PlaylistInfo;

#[derive(sqlx::FromRow)]
struct PlaylistRow {
    uuid: String,
    name: String,
    created_at: String,
}

fn parse_uuid(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|e| AppError::Database(format!("Bad uuid '{}': {}", raw, e)))
}

/// Persistent store for the song catalog, playlists and loose settings.
#[derive(Clone)]
pub struct DatabaseManager {
    pub pool: Pool<Sqlite>,
}

impl DatabaseManager {
    pub async fn open(db_path: &Path) -> Result<Self, AppError> {
        if let Some(dir) = db_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        log::info!("Connecting to database at: {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        Self::with_pool(pool).await
    }

    /// A private database that lives as long as this manager.
    pub async fn in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Every connection would get its own empty memory db, so keep one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: Pool<Sqlite>) -> Result<Self, AppError> {
        let schema = include_str!("schema.sql");

        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&pool).await.map_err(|e| {
                    AppError::Database(format!(
                        "Failed to execute schema statement '{}': {}",
                        stmt, e
                    ))
                })?;
            }
        }

        Ok(Self { pool })
    }

    /// Replaces the stored catalog with `songs`, keeping their order.
    pub async fn save_library(&self, songs: &[Song]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM songs").execute(&mut *tx).await?;

        for (position, song) in songs.iter().enumerate() {
            let data = serde_json::to_string(song)?;
            sqlx::query("INSERT INTO songs (uuid, position, data) VALUES (?, ?, ?)")
                .bind(song.uuid.to_string())
                .bind(position as i64)
                .bind(data)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn load_library(&self) -> Result<Vec<Song>, AppError> {
        let rows = sqlx::query("SELECT data FROM songs ORDER BY position ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut songs = Vec::with_capacity(rows.len());
        for row in rows {
            let data: String = row.try_get("data")?;
            match serde_json::from_str::<Song>(&data) {
                Ok(song) => songs.push(song),
                Err(e) => log::warn!("[Database] Dropping unreadable song row: {}", e),
            }
        }
        Ok(songs)
    }

    pub async fn save_playlists(&self, playlists: &[PlaylistInfo]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM playlist_tracks")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM playlists").execute(&mut *tx).await?;

        for (position, playlist) in playlists.iter().enumerate() {
            let uuid = playlist.uuid.to_string();
            sqlx::query(
                "INSERT INTO playlists (uuid, name, position, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&uuid)
            .bind(&playlist.name)
            .bind(position as i64)
            .bind(playlist.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;

            for (track_position, song) in playlist.tracks.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO playlist_tracks (playlist_uuid, position, song_uuid) VALUES (?, ?, ?)",
                )
                .bind(&uuid)
                .bind(track_position as i64)
                .bind(song.to_string())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn load_playlists(&self) -> Result<Vec<PlaylistInfo>, AppError> {
        let rows = sqlx::query_as::<_, PlaylistRow>(
            "SELECT uuid, name, created_at FROM playlists ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut playlists = Vec::with_capacity(rows.len());
        for row in rows {
            let tracks = sqlx::query(
                "SELECT song_uuid FROM playlist_tracks WHERE playlist_uuid = ? ORDER BY position ASC",
            )
            .bind(&row.uuid)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|r| {
                r.try_get::<String, _>("song_uuid")
                    .map_err(AppError::from)
                    .and_then(|raw| parse_uuid(&raw))
            })
            .collect::<Result<Vec<Uuid>, AppError>>()?;

            let created_at = chrono::DateTime::parse_from_rfc3339(&row.created_at)
                .map(|t| t.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now());

            playlists.push(PlaylistInfo {
                uuid: parse_uuid(&row.uuid)?,
                name: row.name,
                tracks,
                created_at,
            });
        }
        Ok(playlists)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(row) => Some(row.try_get("value")?),
            None => None,
        })
    }
}
