//! Line / Frame - Line Source and Frame Assembler output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One decoded text line from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Line text, trailing whitespace already trimmed
    pub text: String,

    /// Wall-clock arrival time
    pub received_at: DateTime<Utc>,
}

impl Line {
    /// Create a line received at the given instant
    pub fn new(text: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            received_at,
        }
    }

    /// Create a line received now
    pub fn now(text: impl Into<String>) -> Self {
        Self::new(text, Utc::now())
    }
}

/// A completed frame: the lines between one start marker and the next end
/// marker, markers excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Collected lines in arrival order
    pub lines: Vec<Line>,

    /// Arrival time of the start marker
    pub opened_at: DateTime<Utc>,

    /// Arrival time of the end marker
    pub closed_at: DateTime<Utc>,
}

impl Frame {
    /// Number of collected lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when no line was collected between the markers
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Newline-joined original text
    pub fn raw_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
