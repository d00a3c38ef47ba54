//! ReadingSink trait - Ingestion Writer output interface

use crate::{Ack, PersistenceFault, Reading};

/// Persistent store for readings.
///
/// `insert` is a single atomic insert (never an upsert) acknowledged by the
/// store before returning.
#[trait_variant::make(ReadingSink: Send)]
pub trait LocalReadingSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Insert one reading
    ///
    /// # Errors
    /// Returns the persistence fault (should include context)
    async fn insert(&mut self, reading: &Reading) -> Result<Ack, PersistenceFault>;

    /// Release the store connection
    async fn close(&mut self) -> Result<(), PersistenceFault>;
}
