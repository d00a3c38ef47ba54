//! # Writer
//!
//! Persistence stage of the station pipeline.
//!
//! - [`IngestionWriter`]: one atomic insert per reading, optional retry,
//!   failure logging and journaling
//! - [`SqliteSink`] / [`LogSink`] / [`MemorySink`]: reading sinks
//! - [`RecoveryJournal`] and [`recover_journal`]: offline replay of failed
//!   writes

pub mod error;
pub mod journal;
pub mod metrics;
pub mod recover;
pub mod sinks;
pub mod store;
pub mod writer;

pub use contracts::ReadingSink;
pub use error::WriterError;
pub use journal::{JournalEntry, RecoveryJournal};
pub use metrics::{WriterMetrics, WriterSnapshot};
pub use recover::{recover_journal, RecoveryReport};
pub use sinks::{LogSink, MemorySink, MemoryStore, SqliteSink};
pub use store::{Database, StoredReading};
pub use writer::IngestionWriter;
