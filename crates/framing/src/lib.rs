//! # Framing
//!
//! Frame assembly and field extraction.
//!
//! ```text
//! Line ──▶ FrameAssembler ──Frame──▶ FieldExtractor ──▶ Reading + DecodeFaults
//! ```

mod assembler;
mod error;
mod extractor;

pub use assembler::{AssemblerState, AssemblerStats, FrameAssembler, Markers};
pub use error::FramingError;
pub use extractor::{Extraction, FieldExtractor, Pattern, STATION_PATTERNS};
