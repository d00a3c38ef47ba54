//! Writer errors

use std::path::PathBuf;

use contracts::PersistenceFault;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriterError {
    /// Database file could not be opened or prepared
    #[error("failed to open database '{path}': {message}")]
    Open { path: PathBuf, message: String },

    /// Schema migration failed
    #[error("migration to schema version {version} failed: {source}")]
    Migration {
        version: i32,
        #[source]
        source: rusqlite::Error,
    },

    /// Database was created by a newer build
    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i32, supported: i32 },

    /// Database worker thread is gone
    #[error("database worker unavailable: {0}")]
    Worker(String),

    /// SQLite error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored row could not be decoded
    #[error("invalid row: {0}")]
    InvalidRow(String),

    /// Journal file IO
    #[error("journal '{path}': {source}")]
    Journal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Journal line is not a valid entry
    #[error("journal line {line}: {source}")]
    JournalEntry {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl WriterError {
    pub fn journal(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Journal {
            path: path.into(),
            source,
        }
    }

    /// Map to the fault reported for a single write.
    ///
    /// Constraint violations are rejections; everything else means the store
    /// could not be reached.
    pub fn into_fault(self, sink: &str) -> PersistenceFault {
        match &self {
            WriterError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                PersistenceFault::rejected(sink, self.to_string())
            }
            WriterError::Sqlite(rusqlite::Error::ToSqlConversionFailure(_))
            | WriterError::InvalidRow(_) => PersistenceFault::rejected(sink, self.to_string()),
            _ => PersistenceFault::unavailable(sink, self.to_string()),
        }
    }
}
