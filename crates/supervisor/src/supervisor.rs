//! Supervisor - owns the source and the writer and drives the pull loop
//!
//! Lines are pushed one at a time through assembler, extractor and writer
//! before the next pull. Only the pull (and reconnect waits) race against the
//! shutdown signal; a write in progress always finishes. The source and the
//! sink are closed on every exit path.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use contracts::{
    Line, LineSource, PersistenceFault, ReadingSink, ReconnectConfig, TransportFault,
};
use framing::{FieldExtractor, FrameAssembler};
use ingestion::{CaptureWriter, IngestionMetrics};
use tracing::{debug, error, info, instrument, trace, warn};
use writer::IngestionWriter;

use crate::stats::PipelineStats;

/// Why a run ended
#[derive(Debug)]
pub enum ShutdownReason {
    /// Shutdown signal observed
    Interrupted,
    /// Source reported a clean end of stream
    EndOfStream,
    /// Transport fault with no reconnect left
    TransportFault(TransportFault),
}

impl ShutdownReason {
    /// True for interrupt and end of stream
    pub fn is_clean(&self) -> bool {
        !matches!(self, ShutdownReason::TransportFault(_))
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Interrupted => f.write_str("interrupted"),
            ShutdownReason::EndOfStream => f.write_str("end of stream"),
            ShutdownReason::TransportFault(fault) => write!(f, "transport fault: {fault}"),
        }
    }
}

/// Outcome of [`Supervisor::run`]
#[derive(Debug)]
pub struct RunReport {
    pub reason: ShutdownReason,
    pub stats: PipelineStats,
}

/// Pipeline supervisor
pub struct Supervisor<S, K> {
    source: S,
    assembler: FrameAssembler,
    extractor: FieldExtractor,
    writer: IngestionWriter<K>,
    reconnect: ReconnectConfig,
    reconnect_attempts: u32,
    capture: Option<CaptureWriter>,
    metrics: Arc<IngestionMetrics>,
    stats: PipelineStats,
}

impl<S: LineSource, K: ReadingSink> Supervisor<S, K> {
    /// Supervisor with reconnect disabled and no capture
    pub fn new(
        source: S,
        assembler: FrameAssembler,
        extractor: FieldExtractor,
        writer: IngestionWriter<K>,
    ) -> Self {
        Self {
            source,
            assembler,
            extractor,
            writer,
            reconnect: ReconnectConfig::default(),
            reconnect_attempts: 0,
            capture: None,
            metrics: Arc::new(IngestionMetrics::new()),
            stats: PipelineStats::default(),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Append every received line to a capture file
    pub fn with_capture(mut self, capture: CaptureWriter) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Live line-level counters
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until the stream ends, a transport fault is final, or `shutdown`
    /// completes. Resources are released before returning.
    #[instrument(name = "supervisor_run", skip_all, fields(endpoint = %self.source.endpoint()))]
    pub async fn run<F>(mut self, shutdown: F) -> RunReport
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        tokio::pin!(shutdown);

        info!(
            endpoint = %self.source.endpoint(),
            sink = %self.writer.sink_name(),
            reconnect_attempts = self.reconnect.max_attempts,
            "ingestion started"
        );

        let reason = loop {
            let pulled = tokio::select! {
                biased;
                _ = shutdown.as_mut() => break ShutdownReason::Interrupted,
                pulled = self.source.next_line() => pulled,
            };

            match pulled {
                Ok(Some(line)) => {
                    self.reconnect_attempts = 0;
                    self.handle_line(line).await;
                }
                Ok(None) => break ShutdownReason::EndOfStream,
                Err(fault) => {
                    self.metrics.record_transport_fault();
                    observability::record_transport_fault(&fault);
                    error!(
                        endpoint = %self.source.endpoint(),
                        kind = fault.kind(),
                        error = %fault,
                        "transport fault"
                    );
                    if let Err(reason) = self.recover(fault, shutdown.as_mut()).await {
                        break reason;
                    }
                }
            }
        };

        self.release().await;

        let mut stats = self.finish_stats();
        stats.duration = started.elapsed();

        match &reason {
            ShutdownReason::TransportFault(fault) => {
                error!(error = %fault, persisted = stats.persisted, "ingestion stopped")
            }
            _ => info!(reason = %reason, persisted = stats.persisted, "ingestion stopped"),
        }

        RunReport { reason, stats }
    }

    async fn handle_line(&mut self, line: Line) {
        self.metrics.record_line();
        observability::record_line_received();
        trace!(received_at = %line.received_at, text = %line.text, "line received");

        self.capture_line(&line).await;

        let discarded_before = self.assembler.stats().partial_frames_discarded;
        let frame = self.assembler.push(line);
        if self.assembler.stats().partial_frames_discarded > discarded_before {
            observability::record_frame_discarded("restart");
        }

        let Some(frame) = frame else {
            return;
        };

        observability::record_frame_closed(frame.len());
        self.stats.frame_lines.push(frame.len() as f64);
        let closed_at = frame.closed_at;

        let extraction = self.extractor.extract(frame);
        for fault in &extraction.faults {
            self.stats.decode_faults += 1;
            observability::record_decode_fault(fault);
            warn!(
                field = %fault.field,
                raw = %fault.raw,
                error = %fault.message,
                frame_closed_at = %closed_at,
                "field value could not be decoded"
            );
        }

        let Some(reading) = extraction.reading else {
            debug!(closed_at = %closed_at, "empty frame, nothing to persist");
            return;
        };

        self.stats.readings_extracted += 1;
        self.stats.fields_present.push(reading.present_count() as f64);
        observability::record_reading_extracted(&reading);

        // The writer has already logged and journaled a failure
        match self.writer.write(&reading).await {
            Ok(ack) => trace!(record_id = ?ack.record_id, "reading acknowledged"),
            Err(fault) => {
                if matches!(fault, PersistenceFault::Rejected { .. }) {
                    self.stats.writes_rejected += 1;
                }
                debug!(kind = fault.kind(), closed_at = %closed_at, "reading not persisted");
            }
        }
    }

    async fn capture_line(&mut self, line: &Line) {
        let failed = match self.capture.as_mut() {
            Some(capture) => match capture.append(line).await {
                Ok(()) => None,
                Err(e) => Some((capture.path().display().to_string(), e)),
            },
            None => None,
        };

        if let Some((path, e)) = failed {
            self.metrics.record_capture_error();
            warn!(path = %path, error = %e, "capture write failed, capture disabled");
            self.capture = None;
        }
    }

    /// Apply the reconnect policy after a transport fault.
    ///
    /// `Ok` means the source is usable again.
    async fn recover<F>(
        &mut self,
        fault: TransportFault,
        mut shutdown: Pin<&mut F>,
    ) -> Result<(), ShutdownReason>
    where
        F: Future<Output = ()>,
    {
        if !self.reconnect.enabled() {
            return Err(ShutdownReason::TransportFault(fault));
        }

        if self.assembler.reset() {
            observability::record_frame_discarded("reconnect");
            warn!("partial frame dropped after transport fault");
        }

        let max_attempts = self.reconnect.max_attempts;
        let mut last_fault = fault;

        while self.reconnect_attempts < max_attempts {
            self.reconnect_attempts += 1;
            let attempt = self.reconnect_attempts;
            let delay = self.reconnect.backoff(attempt);

            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "reconnecting"
            );

            tokio::select! {
                biased;
                _ = shutdown.as_mut() => return Err(ShutdownReason::Interrupted),
                _ = tokio::time::sleep(delay) => {}
            }

            let result = tokio::select! {
                biased;
                _ = shutdown.as_mut() => return Err(ShutdownReason::Interrupted),
                result = self.source.reconnect() => result,
            };

            match result {
                Ok(()) => {
                    self.metrics.record_reconnect();
                    observability::record_reconnect(true);
                    info!(attempt, endpoint = %self.source.endpoint(), "reconnected");
                    return Ok(());
                }
                Err(e) => {
                    observability::record_reconnect(false);
                    warn!(attempt, error = %e, "reconnect failed");
                    last_fault = e;
                }
            }
        }

        error!(max_attempts, "reconnect attempts exhausted");
        Err(ShutdownReason::TransportFault(last_fault))
    }

    #[instrument(name = "supervisor_release", skip(self))]
    async fn release(&mut self) {
        if let Err(e) = self.source.close().await {
            error!(endpoint = %self.source.endpoint(), error = %e, "failed to close transport");
        }
        if let Err(e) = self.writer.close().await {
            error!(sink = %self.writer.sink_name(), error = %e, "failed to close store");
        }
        if let Some(capture) = self.capture.take() {
            if let Err(e) = capture.close().await {
                warn!(error = %e, "failed to close capture file");
            }
        }
        debug!("resources released");
    }

    fn finish_stats(&mut self) -> PipelineStats {
        let mut stats = std::mem::take(&mut self.stats);

        let framing = self.assembler.stats();
        stats.frames_closed = framing.frames_emitted;
        stats.empty_frames = framing.empty_frames;
        stats.partial_frames_discarded = framing.partial_frames_discarded;
        stats.stray_end_markers = framing.stray_end_markers;
        stats.lines_outside_frames = framing.lines_outside_frames;

        let lines = self.metrics.snapshot();
        stats.lines_received = lines.lines_received;
        stats.transport_faults = lines.transport_faults;
        stats.reconnects = lines.reconnects;

        let writes = self.writer.metrics().snapshot();
        stats.persisted = writes.persisted;
        stats.write_failures = writes.failed;
        stats.write_retries = writes.retries;
        stats.journaled = writes.journaled;

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DEFAULT_END_MARKER as END, DEFAULT_START_MARKER as START};
    use ingestion::ScriptedLineSource;
    use std::time::Duration;
    use writer::MemorySink;

    fn supervisor(
        source: ScriptedLineSource,
        sink: MemorySink,
    ) -> Supervisor<ScriptedLineSource, MemorySink> {
        Supervisor::new(
            source,
            FrameAssembler::default(),
            FieldExtractor::station().unwrap(),
            IngestionWriter::new(sink),
        )
    }

    fn fast_reconnect(max_attempts: u32) -> ReconnectConfig {
        ReconnectConfig {
            max_attempts,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        }
    }

    fn never() -> std::future::Pending<()> {
        std::future::pending()
    }

    #[tokio::test]
    async fn test_frames_persist_in_order() {
        let source = ScriptedLineSource::from_lines([
            START,
            "Temperature: 20.0",
            END,
            "noise between frames",
            START,
            "Temperature: 21.0",
            "Soil Moisture: 300",
            END,
        ]);
        let tracker = source.tracker();
        let sink = MemorySink::new();
        let store = sink.store();

        let report = supervisor(source, sink).run(never()).await;

        assert!(matches!(report.reason, ShutdownReason::EndOfStream));
        let rows = store.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].temperature, Some(20.0));
        assert_eq!(rows[1].soil_moisture, Some(300));
        assert!(rows[0].timestamp < rows[1].timestamp);

        assert_eq!(report.stats.lines_received, 8);
        assert_eq!(report.stats.frames_closed, 2);
        assert_eq!(report.stats.persisted, 2);
        assert_eq!(report.stats.lines_outside_frames, 1);
        assert!(tracker.is_closed());
        assert!(store.is_closed());
    }

    #[tokio::test]
    async fn test_last_start_wins_through_pipeline() {
        let source = ScriptedLineSource::from_lines([
            START,
            "Temperature: 10",
            START,
            "Temperature: 20",
            END,
        ]);
        let sink = MemorySink::new();
        let store = sink.store();

        let report = supervisor(source, sink).run(never()).await;

        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].temperature, Some(20.0));
        assert_eq!(report.stats.partial_frames_discarded, 1);
    }

    #[tokio::test]
    async fn test_empty_frames_and_stray_ends_store_nothing() {
        let source = ScriptedLineSource::from_lines([END, START, END, END]);
        let sink = MemorySink::new();
        let store = sink.store();

        let report = supervisor(source, sink).run(never()).await;

        assert!(store.rows().is_empty());
        assert_eq!(store.attempts(), 0);
        assert_eq!(report.stats.empty_frames, 1);
        assert_eq!(report.stats.stray_end_markers, 2);
    }

    #[tokio::test]
    async fn test_decode_fault_is_counted_not_fatal() {
        let source =
            ScriptedLineSource::from_lines([START, "Humidity: 4.4.4", "Rain: YES", END]);
        let sink = MemorySink::new();
        let store = sink.store();

        let report = supervisor(source, sink).run(never()).await;

        assert!(report.reason.is_clean());
        assert_eq!(report.stats.decode_faults, 1);
        let rows = store.rows();
        assert_eq!(rows[0].humidity, None);
        assert_eq!(rows[0].rain, Some(true));
    }

    #[tokio::test]
    async fn test_write_failure_does_not_stop_next_reading() {
        let source = ScriptedLineSource::from_lines([
            START,
            "Temperature: 1",
            END,
            START,
            "Temperature: 2",
            END,
        ]);
        let sink = MemorySink::new().failing_attempts([1]);
        let store = sink.store();

        let report = supervisor(source, sink).run(never()).await;

        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].temperature, Some(2.0));
        assert_eq!(report.stats.write_failures, 1);
        assert_eq!(report.stats.writes_rejected, 0);
        assert_eq!(report.stats.persisted, 1);
    }

    #[tokio::test]
    async fn test_rejected_writes_are_counted() {
        let source = ScriptedLineSource::from_lines([
            START,
            "Temperature: 1",
            END,
            START,
            "Humidity: 30",
            END,
        ]);
        let sink = MemorySink::new().failing_attempts([1]).rejecting();
        let store = sink.store();

        let report = supervisor(source, sink).run(never()).await;

        assert!(matches!(report.reason, ShutdownReason::EndOfStream));
        assert_eq!(store.rows().len(), 1);
        assert_eq!(store.rows()[0].humidity, Some(30.0));
        assert_eq!(report.stats.readings_extracted, 2);
        assert_eq!(report.stats.write_failures, 1);
        assert_eq!(report.stats.writes_rejected, 1);
        assert_eq!(report.stats.persisted, 1);
    }

    #[tokio::test]
    async fn test_transport_fault_terminates_without_reconnect() {
        let source = ScriptedLineSource::from_lines([START, "Temperature: 1", END])
            .fault(TransportFault::disconnected("scripted", "cable pulled"))
            .lines([START, "Temperature: 2", END]);
        let tracker = source.tracker();
        let sink = MemorySink::new();
        let store = sink.store();

        let report = supervisor(source, sink).run(never()).await;

        assert!(matches!(
            report.reason,
            ShutdownReason::TransportFault(TransportFault::Disconnected { .. })
        ));
        assert!(!report.reason.is_clean());
        assert_eq!(store.rows().len(), 1);
        assert_eq!(tracker.reconnects(), 0);
        assert!(tracker.is_closed());
        assert!(store.is_closed());
    }

    #[tokio::test]
    async fn test_reconnect_drops_partial_frame_and_continues() {
        let source = ScriptedLineSource::from_lines([START, "Temperature: 1"])
            .fault(TransportFault::disconnected("scripted", "cable pulled"))
            .lines(["Temperature: 2", END, START, "Temperature: 3", END]);
        let tracker = source.tracker();
        let sink = MemorySink::new();
        let store = sink.store();

        let report = supervisor(source, sink)
            .with_reconnect(fast_reconnect(3))
            .run(never())
            .await;

        assert!(matches!(report.reason, ShutdownReason::EndOfStream));
        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].temperature, Some(3.0));
        assert_eq!(tracker.reconnects(), 1);
        assert_eq!(report.stats.reconnects, 1);
        assert_eq!(report.stats.stray_end_markers, 1);
        assert_eq!(report.stats.partial_frames_discarded, 1);
    }

    #[tokio::test]
    async fn test_reconnect_gives_up_after_budget() {
        let source = ScriptedLineSource::default()
            .fault(TransportFault::disconnected("scripted", "gone"))
            .failing_reconnects(10);
        let tracker = source.tracker();

        let report = supervisor(source, MemorySink::new())
            .with_reconnect(fast_reconnect(2))
            .run(never())
            .await;

        assert!(matches!(
            report.reason,
            ShutdownReason::TransportFault(TransportFault::Open { .. })
        ));
        assert_eq!(tracker.reconnects(), 2);
        assert!(tracker.is_closed());
    }

    #[tokio::test]
    async fn test_reconnect_budget_restored_after_a_line() {
        let source = ScriptedLineSource::default()
            .fault(TransportFault::disconnected("scripted", "flaky"))
            .line("booting")
            .fault(TransportFault::disconnected("scripted", "flaky"))
            .line("booting")
            .fault(TransportFault::disconnected("scripted", "flaky"));
        let tracker = source.tracker();

        let report = supervisor(source, MemorySink::new())
            .with_reconnect(fast_reconnect(1))
            .run(never())
            .await;

        assert!(matches!(report.reason, ShutdownReason::EndOfStream));
        assert_eq!(tracker.reconnects(), 3);
    }

    #[tokio::test]
    async fn test_interrupt_releases_resources() {
        let source = ScriptedLineSource::from_lines([START, "Temperature: 1", END]).hold_open();
        let tracker = source.tracker();
        let sink = MemorySink::new();
        let store = sink.store();

        let report = supervisor(source, sink)
            .run(tokio::time::sleep(Duration::from_millis(50)))
            .await;

        assert!(matches!(report.reason, ShutdownReason::Interrupted));
        assert!(report.reason.is_clean());
        assert_eq!(store.rows().len(), 1);
        assert!(tracker.is_closed());
        assert!(store.is_closed());
    }

    #[tokio::test]
    async fn test_interrupt_during_reconnect_backoff() {
        let source = ScriptedLineSource::default()
            .fault(TransportFault::disconnected("scripted", "gone"))
            .failing_reconnects(100);
        let tracker = source.tracker();
        let reconnect = ReconnectConfig {
            max_attempts: 100,
            initial_backoff_ms: 10_000,
            max_backoff_ms: 10_000,
        };

        let report = supervisor(source, MemorySink::new())
            .with_reconnect(reconnect)
            .run(tokio::time::sleep(Duration::from_millis(30)))
            .await;

        assert!(matches!(report.reason, ShutdownReason::Interrupted));
        assert_eq!(tracker.reconnects(), 0);
        assert!(tracker.is_closed());
    }

    #[tokio::test]
    async fn test_capture_records_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.log");
        let capture = CaptureWriter::open(&path).await.unwrap();
        let source = ScriptedLineSource::from_lines(["hello", START, "Rain: NO", END]);

        supervisor(source, MemorySink::new())
            .with_capture(capture)
            .run(never())
            .await;

        let content = std::fs::read_to_string(&path).unwrap();
        let texts: Vec<_> = content
            .lines()
            .map(|l| ingestion::parse_capture_line(l).1.to_string())
            .collect();
        assert_eq!(texts, vec!["hello", START, "Rain: NO", END]);
    }
}
