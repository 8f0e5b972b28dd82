use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResonanceError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to initialize database: {0}")]
    DatabaseInitializationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ResonanceError {
    /// True for SQLite contention (`SQLITE_BUSY` / `SQLITE_LOCKED`), which is safe to retry.
    pub fn is_busy(&self) -> bool {
        match self {
            ResonanceError::RusqliteError(rusqlite::Error::SqliteFailure(code, _)) => matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}
