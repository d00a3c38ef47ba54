//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the ingestion
//! workspace. Business crates depend on this crate only, never on each other
//! in reverse.
//!
//! ## Time Model
//! - Every `Line` carries the wall-clock instant it was received (UTC)
//! - A `Reading` is stamped with the close time of its frame (the instant the
//!   end marker was received)

mod error;
mod line;
mod line_source;
mod reading;
mod sink;
mod station;

pub use error::*;
pub use line::{Frame, Line};
pub use line_source::LineSource;
pub use reading::*;
pub use sink::*;
pub use station::*;
