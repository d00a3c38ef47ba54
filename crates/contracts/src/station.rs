//! StationConfig - Config Loader output
//!
//! Describes one ingestion station: where lines come from, how frames are
//! delimited, where readings go, and whether raw lines are captured.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Start marker printed by the station firmware before each reading block
pub const DEFAULT_START_MARKER: &str = "----- Sensor Readings -----";

/// End marker printed after each reading block
pub const DEFAULT_END_MARKER: &str = "---------------------------";

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete station configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Line source settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Frame marker settings
    #[serde(default)]
    pub framing: FramingConfig,

    /// Persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Raw line capture
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Transport type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// tty device node (line discipline configured outside this process)
    #[default]
    Device,
    /// Serial-over-TCP bridge
    Tcp,
    /// Standard input
    Stdin,
    /// Capture file replay
    Replay,
}

/// Line source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Transport type
    #[serde(default)]
    pub kind: TransportKind,

    /// Device node or capture file (device / replay)
    #[serde(default = "default_device_path")]
    pub path: PathBuf,

    /// `host:port` of the bridge (tcp)
    #[serde(default)]
    pub address: Option<String>,

    /// Delay after opening before the first read, in milliseconds.
    /// Defaults to 2000 for devices (the board resets when the port opens)
    /// and 0 otherwise.
    #[serde(default)]
    pub settle_ms: Option<u64>,

    /// Read timeout in seconds (0 = wait forever)
    #[serde(default)]
    pub read_timeout_secs: u64,

    /// Replace invalid UTF-8 instead of failing the connection
    #[serde(default)]
    pub lossy_utf8: bool,

    /// Replay speed multiplier (1.0 = recorded pace)
    #[serde(default = "default_replay_speed")]
    pub replay_speed: f64,

    /// Reconnect policy
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            path: default_device_path(),
            address: None,
            settle_ms: None,
            read_timeout_secs: 0,
            lossy_utf8: false,
            replay_speed: default_replay_speed(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

fn default_device_path() -> PathBuf {
    PathBuf::from("/dev/ttyACM0")
}

fn default_replay_speed() -> f64 {
    1.0
}

impl TransportConfig {
    /// Endpoint description for logs
    pub fn endpoint(&self) -> String {
        match self.kind {
            TransportKind::Device | TransportKind::Replay => self.path.display().to_string(),
            TransportKind::Tcp => self.address.clone().unwrap_or_default(),
            TransportKind::Stdin => "stdin".to_string(),
        }
    }

    /// Effective settle delay
    pub fn settle_delay(&self) -> Duration {
        let ms = self.settle_ms.unwrap_or(match self.kind {
            TransportKind::Device => 2000,
            _ => 0,
        });
        Duration::from_millis(ms)
    }

    /// Effective read timeout, `None` when disabled
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }
}

/// Reconnect-on-transport-fault policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Consecutive reconnect attempts before giving up (0 = never reconnect)
    #[serde(default)]
    pub max_attempts: u32,

    /// First backoff delay
    #[serde(default = "default_reconnect_initial_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling
    #[serde(default = "default_reconnect_max_ms")]
    pub max_backoff_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_backoff_ms: default_reconnect_initial_ms(),
            max_backoff_ms: default_reconnect_max_ms(),
        }
    }
}

fn default_reconnect_initial_ms() -> u64 {
    500
}

fn default_reconnect_max_ms() -> u64 {
    10_000
}

impl ReconnectConfig {
    /// Whether reconnecting is enabled at all
    pub fn enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Delay before the given attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        exponential_backoff(self.initial_backoff_ms, self.max_backoff_ms, attempt)
    }
}

/// How marker lines are recognised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerMatch {
    /// Trimmed line equals the marker
    #[default]
    Exact,
    /// Line contains the marker anywhere
    Contains,
}

/// Frame marker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramingConfig {
    /// Line opening a frame
    #[serde(default = "default_start_marker")]
    pub start_marker: String,

    /// Line closing a frame
    #[serde(default = "default_end_marker")]
    pub end_marker: String,

    /// Marker recognition mode
    #[serde(default)]
    pub marker_match: MarkerMatch,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            start_marker: default_start_marker(),
            end_marker: default_end_marker(),
            marker_match: MarkerMatch::default(),
        }
    }
}

fn default_start_marker() -> String {
    DEFAULT_START_MARKER.to_string()
}

fn default_end_marker() -> String {
    DEFAULT_END_MARKER.to_string()
}

/// Store type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// SQLite database file
    #[default]
    Sqlite,
    /// Log readings only (no persistence)
    Log,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store type
    #[serde(default)]
    pub kind: StorageKind,

    /// Database file (sqlite)
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// JSON-lines file receiving readings whose write failed
    #[serde(default)]
    pub journal_path: Option<PathBuf>,

    /// Write retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            path: default_database_path(),
            journal_path: None,
            retry: RetryConfig::default(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("sensor_readings.db")
}

/// Write retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per reading, including the first (1 = no retry)
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,

    /// First backoff delay
    #[serde(default = "default_retry_initial_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling
    #[serde(default = "default_retry_max_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            initial_backoff_ms: default_retry_initial_ms(),
            max_backoff_ms: default_retry_max_ms(),
        }
    }
}

fn default_retry_attempts() -> u32 {
    1
}

fn default_retry_initial_ms() -> u64 {
    200
}

fn default_retry_max_ms() -> u64 {
    5_000
}

impl RetryConfig {
    /// Delay before the given retry (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        exponential_backoff(self.initial_backoff_ms, self.max_backoff_ms, retry)
    }
}

/// Raw line capture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Append every received line to this file
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// `initial * 2^(attempt-1)`, capped at `max`
fn exponential_backoff(initial_ms: u64, max_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32);
    let ms = initial_ms.saturating_mul(1u64 << exponent).min(max_ms);
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StationConfig::default();
        assert_eq!(config.transport.kind, TransportKind::Device);
        assert_eq!(config.transport.settle_delay(), Duration::from_millis(2000));
        assert_eq!(config.transport.read_timeout(), None);
        assert!(!config.transport.reconnect.enabled());
        assert_eq!(config.framing.start_marker, DEFAULT_START_MARKER);
        assert_eq!(config.framing.end_marker, DEFAULT_END_MARKER);
        assert_eq!(config.storage.retry.max_attempts, 1);
        assert!(config.capture.path.is_none());
    }

    #[test]
    fn test_settle_delay_depends_on_kind() {
        let mut transport = TransportConfig {
            kind: TransportKind::Stdin,
            ..Default::default()
        };
        assert_eq!(transport.settle_delay(), Duration::ZERO);

        transport.settle_ms = Some(250);
        assert_eq!(transport.settle_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_endpoint_by_kind() {
        let tcp = TransportConfig {
            kind: TransportKind::Tcp,
            address: Some("10.0.0.5:4000".into()),
            ..Default::default()
        };
        assert_eq!(tcp.endpoint(), "10.0.0.5:4000");

        let stdin = TransportConfig {
            kind: TransportKind::Stdin,
            ..Default::default()
        };
        assert_eq!(stdin.endpoint(), "stdin");
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let retry = RetryConfig {
            max_attempts: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 350,
        };
        assert_eq!(retry.backoff(1), Duration::from_millis(100));
        assert_eq!(retry.backoff(2), Duration::from_millis(200));
        assert_eq!(retry.backoff(3), Duration::from_millis(350));
        assert_eq!(retry.backoff(60), Duration::from_millis(350));
    }

    #[test]
    fn test_json_round_trip_preserves_sections() {
        let mut config = StationConfig::default();
        config.transport.kind = TransportKind::Replay;
        config.transport.path = PathBuf::from("capture.log");
        config.storage.journal_path = Some(PathBuf::from("failed.jsonl"));

        let json = serde_json::to_string(&config).unwrap();
        let back: StationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.transport.kind, TransportKind::Replay);
        assert_eq!(back.storage.journal_path, config.storage.journal_path);
    }
}
