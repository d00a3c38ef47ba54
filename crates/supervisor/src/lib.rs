//! # Supervisor
//!
//! Drives the station pipeline:
//!
//! ```text
//! LineSource ──▶ FrameAssembler ──▶ FieldExtractor ──▶ IngestionWriter ──▶ ReadingSink
//! ```
//!
//! and owns the reconnect policy and shutdown.

mod stats;
mod supervisor;

pub use stats::PipelineStats;
pub use supervisor::{RunReport, ShutdownReason, Supervisor};
