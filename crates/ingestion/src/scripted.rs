//! Scripted line source for tests and dry runs
//!
//! Serves a fixed script of lines, faults and end-of-stream markers.
//! Lines built with [`ScriptedLineSource::line`] are stamped one second apart
//! from a fixed base time so ordering assertions stay deterministic.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use contracts::{Line, LineSource, TransportFault};
use tracing::debug;

/// One scripted step
#[derive(Debug)]
pub enum ScriptStep {
    Line(Line),
    Fault(TransportFault),
    End,
}

/// Observes a scripted source after it has been moved into a supervisor
#[derive(Debug, Clone, Default)]
pub struct SourceTracker {
    closed: Arc<AtomicBool>,
    reconnects: Arc<AtomicU32>,
    lines_served: Arc<AtomicU64>,
}

impl SourceTracker {
    /// Whether `close()` was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of `reconnect()` calls
    pub fn reconnects(&self) -> u32 {
        self.reconnects.load(Ordering::SeqCst)
    }

    /// Number of lines handed out
    pub fn lines_served(&self) -> u64 {
        self.lines_served.load(Ordering::SeqCst)
    }
}

/// Line source serving a prepared script
pub struct ScriptedLineSource {
    endpoint: String,
    steps: VecDeque<ScriptStep>,
    clock: DateTime<Utc>,
    hold_open: bool,
    failing_reconnects: u32,
    tracker: SourceTracker,
}

impl Default for ScriptedLineSource {
    fn default() -> Self {
        Self::new("scripted")
    }
}

impl ScriptedLineSource {
    /// Create an empty script
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            steps: VecDeque::new(),
            clock: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            hold_open: false,
            failing_reconnects: 0,
            tracker: SourceTracker::default(),
        }
    }

    /// Script serving the given lines, then ending
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lines.into_iter().fold(Self::default(), |source, text| source.line(text))
    }

    /// Append a line stamped one second after the previous one
    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.clock += Duration::seconds(1);
        let line = Line::new(text, self.clock);
        self.steps.push_back(ScriptStep::Line(line));
        self
    }

    /// Append a line with an explicit timestamp
    pub fn line_at(mut self, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.clock = at;
        self.steps.push_back(ScriptStep::Line(Line::new(text, at)));
        self
    }

    /// Append several lines
    pub fn lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lines.into_iter().fold(self, |source, text| source.line(text))
    }

    /// Append a transport fault
    pub fn fault(mut self, fault: TransportFault) -> Self {
        self.steps.push_back(ScriptStep::Fault(fault));
        self
    }

    /// Append an explicit end of stream
    pub fn end(mut self) -> Self {
        self.steps.push_back(ScriptStep::End);
        self
    }

    /// Block forever once the script is exhausted instead of ending
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Make the next `n` reconnect attempts fail
    pub fn failing_reconnects(mut self, n: u32) -> Self {
        self.failing_reconnects = n;
        self
    }

    /// Handle for observing the source after it is moved
    pub fn tracker(&self) -> SourceTracker {
        self.tracker.clone()
    }
}

impl LineSource for ScriptedLineSource {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn next_line(&mut self) -> Result<Option<Line>, TransportFault> {
        match self.steps.pop_front() {
            Some(ScriptStep::Line(line)) => {
                self.tracker.lines_served.fetch_add(1, Ordering::SeqCst);
                Ok(Some(line))
            }
            Some(ScriptStep::Fault(fault)) => Err(fault),
            Some(ScriptStep::End) => Ok(None),
            None if self.hold_open => std::future::pending().await,
            None => Ok(None),
        }
    }

    async fn reconnect(&mut self) -> Result<(), TransportFault> {
        let attempt = self.tracker.reconnects.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(endpoint = %self.endpoint, attempt, "scripted reconnect");

        if self.failing_reconnects > 0 {
            self.failing_reconnects -= 1;
            return Err(TransportFault::open(&self.endpoint, "scripted reconnect failure"));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportFault> {
        self.tracker.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
