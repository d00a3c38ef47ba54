//! SqliteSink - inserts readings into the `sensor_readings` table

use std::path::PathBuf;

use contracts::{Ack, PersistenceFault, Reading, ReadingSink};
use tracing::instrument;

use crate::error::WriterError;
use crate::store::Database;

/// Sink backed by the SQLite store
pub struct SqliteSink {
    name: String,
    db: Database,
}

impl SqliteSink {
    /// Open the database at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, WriterError> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Wrap an already-open database
    pub fn new(db: Database) -> Self {
        Self {
            name: "sqlite".to_string(),
            db,
        }
    }

    /// Underlying database handle
    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl ReadingSink for SqliteSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "sqlite_sink_insert",
        skip(self, reading),
        fields(sink = %self.name, timestamp = %reading.timestamp)
    )]
    async fn insert(&mut self, reading: &Reading) -> Result<Ack, PersistenceFault> {
        self.db
            .insert_reading(reading)
            .await
            .map(Ack::stored)
            .map_err(|e| e.into_fault(&self.name))
    }

    #[instrument(name = "sqlite_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), PersistenceFault> {
        self.db
            .shutdown()
            .await
            .map_err(|e| e.into_fault(&self.name))
    }
}
