//! Framing errors

use contracts::Field;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FramingError {
    /// Pattern does not compile
    #[error("invalid pattern for {field}: {source}")]
    InvalidPattern {
        field: Field,
        #[source]
        source: regex::Error,
    },

    /// Pattern has no group to capture the value
    #[error("pattern for {field} has no capture group")]
    NoCaptureGroup { field: Field },
}
