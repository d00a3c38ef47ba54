//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{StationConfig, StorageKind, TransportKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    transport: String,
    endpoint: String,
    storage: String,
    database: String,
    reconnect_attempts: u32,
    write_attempts: u32,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err(CliError::config_invalid(result.error.unwrap_or_default()).into())
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    transport: format!("{:?}", config.transport.kind),
                    endpoint: config.transport.endpoint(),
                    storage: format!("{:?}", config.storage.kind),
                    database: config.storage.path.display().to_string(),
                    reconnect_attempts: config.transport.reconnect.max_attempts,
                    write_attempts: config.storage.retry.max_attempts,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &StationConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.storage.kind == StorageKind::Log {
        warnings.push("storage.kind = log - readings will be logged, not stored".to_string());
    }

    if config.storage.journal_path.is_none() {
        warnings.push(
            "storage.journal_path not set - failed writes are only logged".to_string(),
        );
    }

    if config.transport.kind == TransportKind::Tcp && config.transport.read_timeout().is_none() {
        warnings.push(
            "transport.read_timeout_secs = 0 - a silent bridge will never be detected".to_string(),
        );
    }

    if config.transport.kind == TransportKind::Replay && config.transport.reconnect.enabled() {
        warnings.push("transport.reconnect has no effect on replay".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Transport: {} ({})", summary.transport, summary.endpoint);
            println!("  Storage: {} ({})", summary.storage, summary.database);
            println!("  Reconnect attempts: {}", summary.reconnect_attempts);
            println!("  Write attempts: {}", summary.write_attempts);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = config_file("[transport]\nkind = \"tcp\"\naddress = \"bridge:4000\"\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });

        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("read_timeout_secs")));
        assert!(warnings.iter().any(|w| w.contains("journal_path")));
        assert_eq!(result.summary.unwrap().endpoint, "bridge:4000");
    }

    #[test]
    fn test_identical_markers_are_invalid() {
        let file = config_file("[framing]\nstart_marker = \"---\"\nend_marker = \"---\"\n");
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };

        assert!(!validate_config(&args).valid);
        let err = run_validate(&args).unwrap_err();
        assert_eq!(crate::error::exit_status(&err), 1);
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: PathBuf::from("/nonexistent/station.toml"),
            json: true,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
