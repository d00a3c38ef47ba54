//! ReplayLineSource - replays a capture file
//!
//! Lines are served at the recorded gaps divided by the speed multiplier.
//! Lines without a recorded timestamp are stamped on arrival.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{Line, LineSource, TransportFault};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info, instrument};

use crate::capture::parse_capture_line;

/// Replay a capture file as a line source
pub struct ReplayLineSource {
    endpoint: String,
    path: PathBuf,
    speed: f64,
    lines: Option<Lines<BufReader<File>>>,
    last_recorded: Option<DateTime<Utc>>,
    replayed: u64,
}

impl ReplayLineSource {
    /// Open a capture file
    #[instrument(name = "replay_source_open", skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>, speed: f64) -> Result<Self, TransportFault> {
        let path = path.as_ref().to_path_buf();
        let endpoint = path.display().to_string();
        let file = File::open(&path)
            .await
            .map_err(|e| TransportFault::open(&endpoint, e.to_string()))?;

        info!(path = %endpoint, speed, "replay opened");

        Ok(Self {
            endpoint,
            path,
            speed,
            lines: Some(BufReader::new(file).lines()),
            last_recorded: None,
            replayed: 0,
        })
    }

    /// Capture file being replayed
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait out the recorded gap
    async fn pace(&mut self, recorded: DateTime<Utc>) {
        if let Some(previous) = self.last_recorded {
            if let Ok(gap) = (recorded - previous).to_std() {
                let wait = Duration::try_from_secs_f64(gap.as_secs_f64() / self.speed)
                    .unwrap_or(Duration::ZERO);
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
            }
        }
        self.last_recorded = Some(recorded);
    }
}

impl LineSource for ReplayLineSource {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn next_line(&mut self) -> Result<Option<Line>, TransportFault> {
        let Some(lines) = self.lines.as_mut() else {
            return Err(TransportFault::disconnected(&self.endpoint, "replay closed"));
        };

        let raw = match lines.next_line().await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(path = %self.endpoint, replayed = self.replayed, "replay finished");
                return Ok(None);
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(TransportFault::malformed(&self.endpoint, e.to_string()))
            }
            Err(e) => return Err(TransportFault::io(&self.endpoint, e)),
        };

        let (recorded, text) = parse_capture_line(&raw);
        let received_at = match recorded {
            Some(ts) => {
                self.pace(ts).await;
                ts
            }
            None => Utc::now(),
        };

        self.replayed += 1;
        Ok(Some(Line::new(text.trim_end(), received_at)))
    }

    async fn reconnect(&mut self) -> Result<(), TransportFault> {
        Err(TransportFault::open(
            &self.endpoint,
            "a replay cannot be reconnected",
        ))
    }

    async fn close(&mut self) -> Result<(), TransportFault> {
        if self.lines.take().is_some() {
            debug!(path = %self.endpoint, replayed = self.replayed, "replay closed");
        }
        Ok(())
    }
}
