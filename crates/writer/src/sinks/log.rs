//! LogSink - logs readings via tracing instead of storing them

use contracts::{Ack, PersistenceFault, Reading, ReadingSink};
use tracing::{info, instrument};

/// Sink that only logs readings (dry runs, debugging)
pub struct LogSink {
    name: String,
    written: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            written: 0,
        }
    }
}

impl ReadingSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_insert",
        skip(self, reading),
        fields(sink = %self.name)
    )]
    async fn insert(&mut self, reading: &Reading) -> Result<Ack, PersistenceFault> {
        self.written += 1;
        info!(
            sink = %self.name,
            timestamp = %reading.timestamp,
            fields = reading.present_count(),
            raw = %reading.raw_text,
            "reading logged"
        );
        Ok(Ack::unkeyed())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), PersistenceFault> {
        info!(sink = %self.name, written = self.written, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_log_sink_insert() {
        let mut sink = LogSink::new("test_log");
        let ack = sink.insert(&Reading::new(Utc::now(), "raw")).await.unwrap();
        assert_eq!(ack.record_id, None);
        assert_eq!(sink.name(), "test_log");
        sink.close().await.unwrap();
    }
}
