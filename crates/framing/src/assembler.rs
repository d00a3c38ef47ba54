//! Frame assembler
//!
//! Two-state machine grouping the lines between a start marker and an end
//! marker into one [`Frame`].

use chrono::{DateTime, Utc};
use contracts::{FramingConfig, Frame, Line, MarkerMatch};
use tracing::{debug, trace};

/// Assembler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// Waiting for a start marker
    Idle,
    /// Inside a frame
    Collecting,
}

/// What a line means to the assembler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineRole {
    Start,
    End,
    Data,
}

/// Frame delimiters and how they are recognised
#[derive(Debug, Clone)]
pub struct Markers {
    start: String,
    end: String,
    mode: MarkerMatch,
}

impl Markers {
    pub fn new(start: impl Into<String>, end: impl Into<String>, mode: MarkerMatch) -> Self {
        Self {
            start: start.into().trim().to_string(),
            end: end.into().trim().to_string(),
            mode,
        }
    }

    fn matches(&self, marker: &str, text: &str) -> bool {
        match self.mode {
            MarkerMatch::Exact => text.trim() == marker,
            MarkerMatch::Contains => text.contains(marker),
        }
    }

    // Start is checked first so a line carrying both counts as a start.
    fn classify(&self, text: &str) -> LineRole {
        if self.matches(&self.start, text) {
            LineRole::Start
        } else if self.matches(&self.end, text) {
            LineRole::End
        } else {
            LineRole::Data
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::from(&FramingConfig::default())
    }
}

impl From<&FramingConfig> for Markers {
    fn from(config: &FramingConfig) -> Self {
        Self::new(&config.start_marker, &config.end_marker, config.marker_match)
    }
}

/// Assembler counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Start markers that opened a frame
    pub frames_opened: u64,
    /// Frames emitted on an end marker (empty ones included)
    pub frames_emitted: u64,
    /// Emitted frames with no lines
    pub empty_frames: u64,
    /// Partial frames dropped by a repeated start marker or a reset
    pub partial_frames_discarded: u64,
    /// End markers seen while idle
    pub stray_end_markers: u64,
    /// Data lines seen while idle
    pub lines_outside_frames: u64,
}

#[derive(Debug)]
struct OpenFrame {
    opened_at: DateTime<Utc>,
    lines: Vec<Line>,
}

/// Frame assembler state machine
#[derive(Debug)]
pub struct FrameAssembler {
    markers: Markers,
    current: Option<OpenFrame>,
    stats: AssemblerStats,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(Markers::default())
    }
}

impl FrameAssembler {
    pub fn new(markers: Markers) -> Self {
        Self {
            markers,
            current: None,
            stats: AssemblerStats::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> AssemblerState {
        match self.current {
            Some(_) => AssemblerState::Collecting,
            None => AssemblerState::Idle,
        }
    }

    /// Counters so far
    pub fn stats(&self) -> &AssemblerStats {
        &self.stats
    }

    /// Feed one line; returns the frame closed by it, if any.
    pub fn push(&mut self, line: Line) -> Option<Frame> {
        match (self.markers.classify(&line.text), self.current.take()) {
            (LineRole::Start, previous) => {
                if let Some(previous) = previous {
                    self.stats.partial_frames_discarded += 1;
                    debug!(
                        dropped_lines = previous.lines.len(),
                        opened_at = %previous.opened_at,
                        "start marker inside open frame, partial frame discarded"
                    );
                }
                self.stats.frames_opened += 1;
                trace!(opened_at = %line.received_at, "frame opened");
                self.current = Some(OpenFrame {
                    opened_at: line.received_at,
                    lines: Vec::new(),
                });
                None
            }
            (LineRole::End, Some(open)) => {
                self.stats.frames_emitted += 1;
                if open.lines.is_empty() {
                    self.stats.empty_frames += 1;
                }
                trace!(lines = open.lines.len(), closed_at = %line.received_at, "frame closed");
                Some(Frame {
                    lines: open.lines,
                    opened_at: open.opened_at,
                    closed_at: line.received_at,
                })
            }
            (LineRole::End, None) => {
                self.stats.stray_end_markers += 1;
                trace!(at = %line.received_at, "stray end marker ignored");
                None
            }
            (LineRole::Data, Some(mut open)) => {
                open.lines.push(line);
                self.current = Some(open);
                None
            }
            (LineRole::Data, None) => {
                self.stats.lines_outside_frames += 1;
                None
            }
        }
    }

    /// Return to `Idle`, dropping any partial frame.
    ///
    /// Returns true when a partial frame was dropped.
    pub fn reset(&mut self) -> bool {
        match self.current.take() {
            Some(open) => {
                self.stats.partial_frames_discarded += 1;
                debug!(dropped_lines = open.lines.len(), "assembler reset, partial frame discarded");
                true
            }
            None => false,
        }
    }
}
