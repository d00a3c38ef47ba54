//! Error types for CLI operations.

use contracts::TransportFault;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parsing or validation error
    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    /// Transport could not be opened or failed for good
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportFault),

    /// Store could not be opened
    #[error("Failed to open store at {path}: {message}")]
    Storage { path: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn storage(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Process exit status for this error
    pub fn exit_status(&self) -> u8 {
        match self {
            CliError::ConfigNotFound { .. } | CliError::ConfigInvalid { .. } => 1,
            CliError::Transport(_) => 2,
            CliError::Storage { .. } => 3,
        }
    }
}

/// Exit status for any command error; unclassified errors map to 1.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CliError>()
        .map_or(1, CliError::exit_status)
}
