//! # Ingestion
//!
//! Line sources for the station pipeline.
//!
//! - [`StreamLineSource`]: tty device, serial-over-TCP bridge or stdin
//! - [`ReplayLineSource`]: capture file replay with recorded pacing
//! - [`ScriptedLineSource`]: in-memory script for tests
//!
//! Also hosts the raw [`CaptureWriter`] and the line-level
//! [`IngestionMetrics`].

mod capture;
mod metrics;
mod replay;
mod scripted;
mod stream;
mod transport;

pub use capture::{format_capture_line, parse_capture_line, CaptureWriter};
pub use metrics::{IngestionMetrics, IngestionSnapshot};
pub use replay::ReplayLineSource;
pub use scripted::{ScriptStep, ScriptedLineSource, SourceTracker};
pub use stream::{StreamLineSource, StreamOptions, StreamTarget};
pub use transport::{open_transport, TransportSource};
