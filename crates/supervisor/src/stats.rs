//! Pipeline statistics.

use std::fmt;
use std::time::Duration;

use observability::RunningStats;

/// Statistics from a supervisor run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Lines pulled from the source
    pub lines_received: u64,

    /// Lines seen outside any frame
    pub lines_outside_frames: u64,

    /// Frames closed by an end marker
    pub frames_closed: u64,

    /// Closed frames with no lines
    pub empty_frames: u64,

    /// Partial frames dropped (repeated start marker or reconnect)
    pub partial_frames_discarded: u64,

    /// End markers with no open frame
    pub stray_end_markers: u64,

    /// Readings handed to the writer
    pub readings_extracted: u64,

    /// Matched values that failed to decode
    pub decode_faults: u64,

    /// Readings acknowledged by the store
    pub persisted: u64,

    /// Readings whose write failed
    pub write_failures: u64,

    /// Failed writes the store refused outright (retrying cannot help)
    pub writes_rejected: u64,

    /// Extra write attempts
    pub write_retries: u64,

    /// Failed readings written to the recovery journal
    pub journaled: u64,

    /// Transport faults observed
    pub transport_faults: u64,

    /// Successful reconnects
    pub reconnects: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Lines per closed frame
    pub frame_lines: RunningStats,

    /// Fields present per reading
    pub fields_present: RunningStats,
}

impl PipelineStats {
    /// Readings per minute over the whole run
    pub fn readings_per_minute(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.persisted as f64 * 60.0 / secs
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n{self}");
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔══════════════════════════════════════════════════════════════╗")?;
        writeln!(f, "║                    Ingestion Statistics                      ║")?;
        writeln!(f, "╚══════════════════════════════════════════════════════════════╝\n")?;

        writeln!(f, "📊 Overview")?;
        writeln!(f, "   ├─ Duration: {:.2}s", self.duration.as_secs_f64())?;
        writeln!(f, "   ├─ Lines received: {}", self.lines_received)?;
        writeln!(f, "   ├─ Readings persisted: {}", self.persisted)?;
        writeln!(f, "   └─ Readings/min: {:.2}", self.readings_per_minute())?;

        writeln!(f, "\n🧩 Framing")?;
        writeln!(f, "   ├─ Frames closed: {}", self.frames_closed)?;
        writeln!(f, "   ├─ Empty frames: {}", self.empty_frames)?;
        writeln!(f, "   ├─ Partial frames discarded: {}", self.partial_frames_discarded)?;
        writeln!(f, "   ├─ Stray end markers: {}", self.stray_end_markers)?;
        writeln!(f, "   ├─ Lines outside frames: {}", self.lines_outside_frames)?;
        writeln!(f, "   └─ Lines per frame: {}", self.frame_lines.summary())?;

        writeln!(f, "\n🔎 Extraction")?;
        writeln!(f, "   ├─ Readings extracted: {}", self.readings_extracted)?;
        writeln!(f, "   ├─ Decode faults: {}", self.decode_faults)?;
        writeln!(f, "   └─ Fields per reading: {}", self.fields_present.summary())?;

        writeln!(f, "\n💾 Persistence")?;
        writeln!(f, "   ├─ Persisted: {}", self.persisted)?;
        writeln!(f, "   ├─ Failed: {}", self.write_failures)?;
        writeln!(f, "   ├─ Rejected: {}", self.writes_rejected)?;
        writeln!(f, "   ├─ Retries: {}", self.write_retries)?;
        writeln!(f, "   └─ Journaled: {}", self.journaled)?;

        writeln!(f, "\n🔌 Transport")?;
        writeln!(f, "   ├─ Faults: {}", self.transport_faults)?;
        writeln!(f, "   └─ Reconnects: {}", self.reconnects)?;

        Ok(())
    }
}
