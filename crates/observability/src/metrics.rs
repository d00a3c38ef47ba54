//! Pipeline metric recorders
//!
//! Each stage reports `sensor_ingest_*` metrics through the `metrics` facade,
//! exported by the Prometheus exporter (no-ops when no recorder is installed).

use contracts::{DecodeFault, Field, Reading, TransportFault};
use metrics::{counter, gauge, histogram};

/// Record one received line
pub fn record_line_received() {
    counter!("sensor_ingest_lines_total").increment(1);
}

/// Record a line decoded with replacement characters
pub fn record_lossy_line() {
    counter!("sensor_ingest_lossy_lines_total").increment(1);
}

/// Record a closed frame
pub fn record_frame_closed(lines: usize) {
    counter!("sensor_ingest_frames_total").increment(1);
    histogram!("sensor_ingest_frame_lines").record(lines as f64);
    if lines == 0 {
        counter!("sensor_ingest_empty_frames_total").increment(1);
    }
}

/// Record a discarded partial frame (`restart` / `reconnect`)
pub fn record_frame_discarded(reason: &'static str) {
    counter!("sensor_ingest_frames_discarded_total", "reason" => reason).increment(1);
}

/// Record an extracted reading
///
/// Latest field values go to the `sensor_ingest_field_value` gauge; absent fields are counted.
pub fn record_reading_extracted(reading: &Reading) {
    counter!("sensor_ingest_readings_total").increment(1);
    gauge!("sensor_ingest_last_reading_timestamp_seconds")
        .set(reading.timestamp.timestamp_millis() as f64 / 1000.0);

    for field in Field::ALL {
        match reading.get(field) {
            Some(value) => {
                let numeric = match value {
                    contracts::FieldValue::Float(v) => v,
                    contracts::FieldValue::Flag(v) => f64::from(u8::from(v)),
                    contracts::FieldValue::Integer(v) => v as f64,
                };
                gauge!("sensor_ingest_field_value", "field" => field.name()).set(numeric);
            }
            None => {
                counter!("sensor_ingest_fields_absent_total", "field" => field.name()).increment(1);
            }
        }
    }
}

/// Record a field decode failure
pub fn record_decode_fault(fault: &DecodeFault) {
    counter!("sensor_ingest_decode_faults_total", "field" => fault.field.name()).increment(1);
}

/// Record a transport fault
pub fn record_transport_fault(fault: &TransportFault) {
    counter!("sensor_ingest_transport_faults_total", "kind" => fault.kind()).increment(1);
}

/// Record a reconnect attempt
pub fn record_reconnect(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("sensor_ingest_reconnects_total", "status" => status).increment(1);
}

/// Record a write outcome
pub fn record_write(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "sensor_ingest_writes_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a write retry
pub fn record_write_retry(sink_name: &str) {
    counter!("sensor_ingest_write_retries_total", "sink" => sink_name.to_string()).increment(1);
}

/// Record write latency (retries included)
pub fn record_write_latency_ms(latency_ms: f64) {
    histogram!("sensor_ingest_write_latency_ms").record(latency_ms);
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.2}, max={:.2}, mean={:.2} (n={})",
                self.min, self.max, self.mean, self.count
            )
        }
    }
}

/// Online statistics (count / min / max / mean)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
            self.mean += (value - self.mean) / self.count as f64;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
