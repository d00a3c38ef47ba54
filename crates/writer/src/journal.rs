//! Recovery journal
//!
//! JSON-lines file holding readings whose write failed, one entry per line,
//! in failure order.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use contracts::{PersistenceFault, Reading};
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::WriterError;

/// One failed write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// When the write gave up
    pub failed_at: DateTime<Utc>,
    /// Fault text
    pub error: String,
    pub reading: Reading,
}

impl JournalEntry {
    pub fn new(reading: &Reading, fault: &PersistenceFault) -> Self {
        Self {
            failed_at: Utc::now(),
            error: fault.to_string(),
            reading: reading.clone(),
        }
    }
}

/// Append-only journal file
#[derive(Debug, Clone)]
pub struct RecoveryJournal {
    path: PathBuf,
}

impl RecoveryJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry and flush it to disk
    pub async fn append(&self, entry: &JournalEntry) -> Result<(), WriterError> {
        let mut line = serde_json::to_string(entry)
            .map_err(|e| WriterError::JournalEntry { line: 0, source: e })?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WriterError::journal(&self.path, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| WriterError::journal(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| WriterError::journal(&self.path, e))?;
        file.sync_data()
            .await
            .map_err(|e| WriterError::journal(&self.path, e))?;

        debug!(path = %self.path.display(), timestamp = %entry.reading.timestamp, "reading journaled");
        Ok(())
    }

    /// Read every entry in file order. A missing file is an empty journal.
    pub async fn read_all(&self) -> Result<Vec<JournalEntry>, WriterError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(WriterError::journal(&self.path, e)),
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .map_err(|source| WriterError::JournalEntry { line: i + 1, source })
            })
            .collect()
    }

    /// Move the live file aside for a recovery pass.
    ///
    /// Returns a journal over `<path>.recovering`; appends made meanwhile start
    /// a fresh live file. A staged file left by an interrupted pass is reused
    /// as is. A missing live file yields an empty staged journal.
    pub async fn take_for_recovery(&self) -> Result<RecoveryJournal, WriterError> {
        let mut staged = self.path.clone().into_os_string();
        staged.push(".recovering");
        let staged = RecoveryJournal::new(staged);

        if tokio::fs::try_exists(&staged.path)
            .await
            .map_err(|e| WriterError::journal(&staged.path, e))?
        {
            warn!(path = %staged.path.display(), "resuming interrupted recovery");
            return Ok(staged);
        }

        match tokio::fs::rename(&self.path, &staged.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(WriterError::journal(&self.path, e))
            }
            _ => Ok(staged),
        }
    }

    /// Delete the journal file; a missing file is fine
    pub async fn remove(&self) -> Result<(), WriterError> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(WriterError::journal(&self.path, e))
            }
            _ => Ok(()),
        }
    }
}
