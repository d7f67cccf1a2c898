use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize, Clone, PartialEq)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Index {index} out of range for queue of length {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("Song {0} is still referenced by a playlist or the queue")]
    InUse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend failed to load track: {0}")]
    BackendLoad(String),

    #[error("Could not read {path}: {reason}")]
    ScanIo { path: String, reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} {}", what, id))
    }

    /// Short machine-readable code, used in `playback_error` events.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::OutOfRange { .. } => "out_of_range",
            AppError::InUse(_) => "in_use",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::BackendLoad(_) => "backend_load",
            AppError::ScanIo { .. } => "scan_io",
            AppError::Database(_) => "database",
            AppError::FileSystem(_) => "file_system",
            AppError::Network(_) => "network",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

// Implement From traits for common error types to simplify conversion

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::FileSystem(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization error: {}", e))
    }
}

impl From<lofty::error::LoftyError> for AppError {
    fn from(e: lofty::error::LoftyError) -> Self {
        AppError::FileSystem(format!("Tag error: {}", e))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", e))
    }
}

impl From<String> for AppError {
    fn from(e: String) -> Self {
        AppError::Internal(e)
    }
}
