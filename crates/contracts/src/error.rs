//! Layered error definitions
//!
//! Categorized by pipeline stage: transport / decode / persistence / config

use thiserror::Error;

use crate::Field;

/// Fault raised by a line source for the current connection.
///
/// Terminal for the connection; whether the process reconnects or exits is
/// decided by the supervisor.
#[derive(Debug, Error)]
pub enum TransportFault {
    /// Transport could not be opened
    #[error("failed to open transport '{endpoint}': {message}")]
    Open { endpoint: String, message: String },

    /// Peer or device went away
    #[error("transport '{endpoint}' disconnected: {message}")]
    Disconnected { endpoint: String, message: String },

    /// No line arrived within the configured read timeout
    #[error("no line received from '{endpoint}' within {timeout_ms}ms")]
    ReadTimeout { endpoint: String, timeout_ms: u64 },

    /// Bytes could not be decoded as text
    #[error("malformed bytes from '{endpoint}': {message}")]
    MalformedBytes { endpoint: String, message: String },

    /// Underlying IO error
    #[error("io error on '{endpoint}': {source}")]
    Io {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
}

impl TransportFault {
    /// Create open error
    pub fn open(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create disconnect error
    pub fn disconnected(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Disconnected {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create malformed-bytes error
    pub fn malformed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedBytes {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Wrap an IO error with the endpoint it happened on
    pub fn io(endpoint: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Disconnected { .. } => "disconnected",
            Self::ReadTimeout { .. } => "read_timeout",
            Self::MalformedBytes { .. } => "malformed_bytes",
            Self::Io { .. } => "io",
        }
    }
}

/// A field matched its pattern but the captured text failed type decoding.
///
/// Recovered locally: the field stays absent for the reading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to decode {field} from '{raw}': {message}")]
pub struct DecodeFault {
    pub field: Field,
    pub raw: String,
    pub message: String,
}

/// Fault raised by a reading sink for a single write.
#[derive(Debug, Clone, Error)]
pub enum PersistenceFault {
    /// Store unreachable or closed
    #[error("sink '{sink}' unavailable: {message}")]
    Unavailable { sink: String, message: String },

    /// Store reachable but refused the row
    #[error("sink '{sink}' rejected write: {message}")]
    Rejected { sink: String, message: String },
}

impl PersistenceFault {
    /// Create unavailable error
    pub fn unavailable(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create rejected-write error
    pub fn rejected(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "unavailable",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Pipeline Errors =====
    /// Transport fault
    #[error(transparent)]
    Transport(#[from] TransportFault),

    /// Persistence fault
    #[error(transparent)]
    Persistence(#[from] PersistenceFault),

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}
