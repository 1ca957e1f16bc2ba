//! Error types for `issue_tracker`.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for the service binary.
#[derive(Error, Debug)]
pub enum TrackerError {
    // === Configuration Errors ===
    /// Configuration value is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Config file is not valid YAML for the expected schema.
    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    // === Storage Errors ===
    /// `SQLite` error while opening or preparing the database.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // === Server Errors ===
    /// The listen address could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system or socket I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }
}

/// Result type using `TrackerError`.
pub type Result<T> = std::result::Result<T, TrackerError>;
