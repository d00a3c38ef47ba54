//! Raw line capture
//!
//! Every line is appended in the station console format `[<timestamp>] <text>`,
//! which the `replay` transport reads back.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use contracts::Line;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// Console timestamp format without offset (treated as UTC)
const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Format one line in capture format
pub fn format_capture_line(line: &Line) -> String {
    format!(
        "[{}] {}",
        line.received_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        line.text
    )
}

/// Split a capture line into its recorded timestamp and text.
///
/// Lines without a parseable `[timestamp]` prefix are returned whole with no
/// timestamp.
pub fn parse_capture_line(raw: &str) -> (Option<DateTime<Utc>>, &str) {
    let Some((stamp, rest)) = raw.strip_prefix('[').and_then(|s| s.split_once(']')) else {
        return (None, raw);
    };

    let parsed = DateTime::parse_from_rfc3339(stamp)
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(stamp, NAIVE_FORMAT).map(|ts| ts.and_utc()));

    match parsed {
        Ok(ts) => (Some(ts), rest.strip_prefix(' ').unwrap_or(rest)),
        Err(_) => (None, raw),
    }
}

/// Append-only capture file writer
pub struct CaptureWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    lines_written: u64,
}

impl CaptureWriter {
    /// Open (or create) the capture file for appending
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        debug!(path = %path.display(), "capture file opened");

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            lines_written: 0,
        })
    }

    /// Capture file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines appended so far
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Append one line and flush it
    pub async fn append(&mut self, line: &Line) -> std::io::Result<()> {
        let mut record = format_capture_line(line);
        record.push('\n');
        self.writer.write_all(record.as_bytes()).await?;
        self.writer.flush().await?;
        self.lines_written += 1;
        Ok(())
    }

    /// Flush and close
    pub async fn close(mut self) -> std::io::Result<()> {
        self.writer.flush().await?;
        self.writer.get_mut().sync_all().await
    }
}
