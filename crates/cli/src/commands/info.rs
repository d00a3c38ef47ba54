//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::StationConfig;
use framing::STATION_PATTERNS;
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct StationInfo<'a> {
    config: &'a StationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    patterns: Vec<PatternInfo>,
}

#[derive(Serialize)]
struct PatternInfo {
    field: &'static str,
    pattern: &'static str,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!("Loading configuration info");

    let config = load_config(args.config.as_deref())?;

    if args.json {
        let patterns = if args.patterns {
            pattern_info()
        } else {
            Vec::new()
        };
        let info = StationInfo {
            config: &config,
            patterns,
        };
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize station info")?;
        println!("{}", json);
    } else {
        print_station_summary(&config);
        if args.patterns {
            print_patterns();
        }
    }

    Ok(())
}

fn pattern_info() -> Vec<PatternInfo> {
    STATION_PATTERNS
        .iter()
        .map(|&(field, pattern)| PatternInfo {
            field: field.name(),
            pattern,
        })
        .collect()
}

/// Print a human-readable configuration summary
pub(super) fn print_station_summary(config: &StationConfig) {
    let transport = &config.transport;
    let storage = &config.storage;

    println!("\n=== Station Configuration ===\n");
    println!("Transport:");
    println!("  Kind: {:?}", transport.kind);
    println!("  Endpoint: {}", transport.endpoint());
    println!("  Settle delay: {} ms", transport.settle_delay().as_millis());
    match transport.read_timeout() {
        Some(timeout) => println!("  Read timeout: {} s", timeout.as_secs()),
        None => println!("  Read timeout: none"),
    }
    println!("  Lossy UTF-8: {}", transport.lossy_utf8);
    if transport.reconnect.enabled() {
        println!(
            "  Reconnect: {} attempts, backoff {}..{} ms",
            transport.reconnect.max_attempts,
            transport.reconnect.initial_backoff_ms,
            transport.reconnect.max_backoff_ms
        );
    } else {
        println!("  Reconnect: disabled");
    }

    println!("\nFraming:");
    println!("  Start marker: {:?}", config.framing.start_marker);
    println!("  End marker: {:?}", config.framing.end_marker);
    println!("  Match: {:?}", config.framing.marker_match);

    println!("\nStorage:");
    println!("  Kind: {:?}", storage.kind);
    println!("  Database: {}", storage.path.display());
    println!("  Write attempts: {}", storage.retry.max_attempts);
    if let Some(ref journal) = storage.journal_path {
        println!("  Journal: {}", journal.display());
    }

    if let Some(ref capture) = config.capture.path {
        println!("\nCapture: {}", capture.display());
    }

    println!();
}

fn print_patterns() {
    println!("Field patterns:");
    for (field, pattern) in STATION_PATTERNS.iter() {
        println!("  {:<14} {}", field.name(), pattern);
    }
    println!();
}
