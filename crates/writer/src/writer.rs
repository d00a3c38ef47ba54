//! IngestionWriter - persists readings through a sink
//!
//! One atomic insert per reading, optional retry with backoff on outages,
//! and a recovery journal for readings that could not be stored. A failed
//! write is logged with the whole reading and returned; it never stops the
//! caller from writing the next one.

use std::sync::Arc;
use std::time::Instant;

use contracts::{Ack, Field, PersistenceFault, Reading, ReadingSink, RetryConfig};
use tracing::{error, info, instrument, warn};

use crate::journal::{JournalEntry, RecoveryJournal};
use crate::metrics::WriterMetrics;

/// Writer wrapping one reading sink
pub struct IngestionWriter<K> {
    sink: K,
    retry: RetryConfig,
    journal: Option<RecoveryJournal>,
    metrics: Arc<WriterMetrics>,
}

impl<K: ReadingSink> IngestionWriter<K> {
    /// Writer with no retry and no journal
    pub fn new(sink: K) -> Self {
        Self {
            sink,
            retry: RetryConfig::default(),
            journal: None,
            metrics: Arc::new(WriterMetrics::new()),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_journal(mut self, journal: RecoveryJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    pub fn metrics(&self) -> &Arc<WriterMetrics> {
        &self.metrics
    }

    /// Persist one reading.
    ///
    /// Outages are retried up to `retry.max_attempts` in total; rejections
    /// are not retried. Exactly one outcome is reported per reading.
    #[instrument(
        name = "writer_write",
        skip(self, reading),
        fields(sink = %self.sink.name(), timestamp = %reading.timestamp)
    )]
    pub async fn write(&mut self, reading: &Reading) -> Result<Ack, PersistenceFault> {
        let max_attempts = self.retry.max_attempts.max(1);
        let started = Instant::now();
        let mut attempt = 1;

        let fault = loop {
            match self.sink.insert(reading).await {
                Ok(ack) => {
                    self.metrics.inc_persisted();
                    observability::record_write(self.sink.name(), true);
                    observability::record_write_latency_ms(
                        started.elapsed().as_secs_f64() * 1000.0,
                    );
                    info!(
                        record_id = ?ack.record_id,
                        timestamp = %reading.timestamp,
                        temperature = %field_text(reading, Field::Temperature),
                        humidity = %field_text(reading, Field::Humidity),
                        motion = %field_text(reading, Field::Motion),
                        rain = %field_text(reading, Field::Rain),
                        soil_moisture = %field_text(reading, Field::SoilMoisture),
                        "reading stored"
                    );
                    return Ok(ack);
                }
                Err(fault @ PersistenceFault::Unavailable { .. }) if attempt < max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    self.metrics.inc_retries();
                    observability::record_write_retry(self.sink.name());
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %fault,
                        "write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(fault) => break fault,
            }
        };

        self.metrics.inc_failed();
        observability::record_write(self.sink.name(), false);
        error!(
            sink = %self.sink.name(),
            error = %fault,
            attempts = attempt,
            timestamp = %reading.timestamp,
            raw = %reading.raw_text,
            reading = %reading_json(reading),
            "Write failed"
        );

        self.journal_failure(reading, &fault).await;
        Err(fault)
    }

    async fn journal_failure(&self, reading: &Reading, fault: &PersistenceFault) {
        let Some(journal) = &self.journal else {
            return;
        };
        match journal.append(&JournalEntry::new(reading, fault)).await {
            Ok(()) => self.metrics.inc_journaled(),
            Err(e) => {
                self.metrics.inc_journal_errors();
                error!(
                    path = %journal.path().display(),
                    error = %e,
                    reading = %reading_json(reading),
                    "failed to journal reading"
                );
            }
        }
    }

    /// Close the underlying sink
    #[instrument(name = "writer_close", skip(self), fields(sink = %self.sink.name()))]
    pub async fn close(&mut self) -> Result<(), PersistenceFault> {
        self.sink.close().await
    }
}

/// Value text for logs, `absent` when the field has no value
fn field_text(reading: &Reading, field: Field) -> String {
    match reading.get(field) {
        Some(value) => value.to_string(),
        None => "absent".to_string(),
    }
}

fn reading_json(reading: &Reading) -> String {
    serde_json::to_string(reading).unwrap_or_else(|_| format!("{reading:?}"))
}
