//! Configuration parsing
//!
//! TOML (primary) and JSON.

use contracts::{ContractError, StationConfig};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<StationConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<StationConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to format
pub fn parse(content: &str, format: ConfigFormat) -> Result<StationConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MarkerMatch, StorageKind, TransportKind};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[transport]
kind = "device"
path = "/dev/ttyUSB0"
settle_ms = 1500

[storage]
path = "data/readings.db"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.transport.kind, TransportKind::Device);
        assert_eq!(config.transport.path.to_str(), Some("/dev/ttyUSB0"));
        assert_eq!(config.transport.settle_ms, Some(1500));
        assert_eq!(config.storage.kind, StorageKind::Sqlite);
    }

    #[test]
    fn test_parse_toml_empty_uses_defaults() {
        let config = parse_toml("").unwrap();
        assert_eq!(config.transport.kind, TransportKind::Device);
        assert_eq!(config.framing.marker_match, MarkerMatch::Exact);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "transport": { "kind": "tcp", "address": "192.168.1.20:4000" },
            "framing": { "marker_match": "contains" },
            "storage": { "kind": "log" }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.transport.kind, TransportKind::Tcp);
        assert_eq!(config.framing.marker_match, MarkerMatch::Contains);
        assert_eq!(config.storage.kind, StorageKind::Log);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_toml_unknown_transport_kind() {
        let content = "[transport]\nkind = \"bluetooth\"\n";
        assert!(parse_toml(content).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
