//! Configuration validation
//!
//! Rules:
//! - markers non-empty and distinct
//! - endpoint present for the selected transport
//! - replay_speed > 0
//! - backoff bounds ordered, retry attempts >= 1
//! - sqlite storage has a path

use contracts::{ContractError, StationConfig, StorageKind, TransportKind};

/// Validate a StationConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &StationConfig) -> Result<(), ContractError> {
    validate_transport(config)?;
    validate_framing(config)?;
    validate_storage(config)?;
    Ok(())
}

fn validate_transport(config: &StationConfig) -> Result<(), ContractError> {
    let transport = &config.transport;

    match transport.kind {
        TransportKind::Device | TransportKind::Replay => {
            if transport.path.as_os_str().is_empty() {
                return Err(ContractError::config_validation(
                    "transport.path",
                    format!("path is required for {:?} transport", transport.kind),
                ));
            }
        }
        TransportKind::Tcp => {
            let address = transport.address.as_deref().unwrap_or_default();
            if address.is_empty() {
                return Err(ContractError::config_validation(
                    "transport.address",
                    "address is required for tcp transport",
                ));
            }
            if !address.contains(':') {
                return Err(ContractError::config_validation(
                    "transport.address",
                    format!("address '{address}' must be host:port"),
                ));
            }
        }
        TransportKind::Stdin => {}
    }

    if !(transport.replay_speed > 0.0) {
        return Err(ContractError::config_validation(
            "transport.replay_speed",
            format!("replay_speed must be > 0, got {}", transport.replay_speed),
        ));
    }

    let reconnect = &transport.reconnect;
    if reconnect.initial_backoff_ms > reconnect.max_backoff_ms {
        return Err(ContractError::config_validation(
            "transport.reconnect",
            format!(
                "initial_backoff_ms ({}) must be <= max_backoff_ms ({})",
                reconnect.initial_backoff_ms, reconnect.max_backoff_ms
            ),
        ));
    }

    Ok(())
}

fn validate_framing(config: &StationConfig) -> Result<(), ContractError> {
    let framing = &config.framing;
    let start = framing.start_marker.trim();
    let end = framing.end_marker.trim();

    if start.is_empty() {
        return Err(ContractError::config_validation(
            "framing.start_marker",
            "start marker cannot be empty",
        ));
    }
    if end.is_empty() {
        return Err(ContractError::config_validation(
            "framing.end_marker",
            "end marker cannot be empty",
        ));
    }
    if start == end {
        return Err(ContractError::config_validation(
            "framing",
            "start and end markers must differ",
        ));
    }
    Ok(())
}

fn validate_storage(config: &StationConfig) -> Result<(), ContractError> {
    let storage = &config.storage;

    if storage.kind == StorageKind::Sqlite && storage.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "storage.path",
            "path is required for sqlite storage",
        ));
    }

    let retry = &storage.retry;
    if retry.max_attempts == 0 {
        return Err(ContractError::config_validation(
            "storage.retry.max_attempts",
            "max_attempts must be >= 1",
        ));
    }
    if retry.initial_backoff_ms > retry.max_backoff_ms {
        return Err(ContractError::config_validation(
            "storage.retry",
            format!(
                "initial_backoff_ms ({}) must be <= max_backoff_ms ({})",
                retry.initial_backoff_ms, retry.max_backoff_ms
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&StationConfig::default()).is_ok());
    }

    #[test]
    fn test_tcp_requires_address() {
        let mut config = StationConfig::default();
        config.transport.kind = TransportKind::Tcp;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("transport.address"));

        config.transport.address = Some("bridge.local".into());
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("host:port"));

        config.transport.address = Some("bridge.local:4000".into());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_replay_requires_path() {
        let mut config = StationConfig::default();
        config.transport.kind = TransportKind::Replay;
        config.transport.path = PathBuf::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_replay_speed_must_be_positive() {
        let mut config = StationConfig::default();
        config.transport.replay_speed = 0.0;
        assert!(validate(&config).is_err());
        config.transport.replay_speed = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_identical_markers_rejected() {
        let mut config = StationConfig::default();
        config.framing.end_marker = config.framing.start_marker.clone();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_blank_marker_rejected() {
        let mut config = StationConfig::default();
        config.framing.start_marker = "   ".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_retry_attempts_at_least_one() {
        let mut config = StationConfig::default();
        config.storage.retry.max_attempts = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_backoff_bounds_ordered() {
        let mut config = StationConfig::default();
        config.transport.reconnect.initial_backoff_ms = 20_000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_log_storage_needs_no_path() {
        let mut config = StationConfig::default();
        config.storage.kind = StorageKind::Log;
        config.storage.path = PathBuf::new();
        assert!(validate(&config).is_ok());
    }
}
