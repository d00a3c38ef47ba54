//! Reading sinks

pub mod log;
pub mod memory;
pub mod sqlite;

pub use log::LogSink;
pub use memory::{MemorySink, MemoryStore};
pub use sqlite::SqliteSink;
