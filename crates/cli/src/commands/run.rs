//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, StationConfig};
use contracts::{ReadingSink, StorageKind, TransportKind};
use framing::{FieldExtractor, FrameAssembler, Markers};
use ingestion::{open_transport, CaptureWriter};
use supervisor::{ShutdownReason, Supervisor};
use tracing::{error, info, warn};
use writer::{IngestionWriter, LogSink, RecoveryJournal, SqliteSink};

use super::{info::print_station_summary, load_config, override_db};
use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_ingest(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args);

    ConfigLoader::validate(&config).map_err(|e| CliError::config_invalid(e.to_string()))?;

    info!(
        transport = ?config.transport.kind,
        endpoint = %config.transport.endpoint(),
        storage = ?config.storage.kind,
        database = %config.storage.path.display(),
        reconnect_attempts = config.transport.reconnect.max_attempts,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_station_summary(&config);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    match config.storage.kind {
        StorageKind::Sqlite => {
            let path = &config.storage.path;
            let sink = SqliteSink::open(path)
                .map_err(|e| CliError::storage(path.display().to_string(), e.to_string()))?;
            supervise(&config, sink).await
        }
        StorageKind::Log => supervise(&config, LogSink::new("log")).await,
    }
}

fn apply_overrides(config: &mut StationConfig, args: &RunArgs) {
    let transport = &mut config.transport;

    if let Some(device) = &args.device {
        info!(device = %device.display(), "Overriding transport from CLI");
        transport.kind = TransportKind::Device;
        transport.path = device.clone();
    }
    if let Some(address) = &args.address {
        info!(address = %address, "Overriding transport from CLI");
        transport.kind = TransportKind::Tcp;
        transport.address = Some(address.clone());
    }
    if args.stdin {
        info!("Overriding transport from CLI: stdin");
        transport.kind = TransportKind::Stdin;
    }
    if let Some(replay) = &args.replay {
        info!(path = %replay.display(), "Overriding transport from CLI: replay");
        transport.kind = TransportKind::Replay;
        transport.path = replay.clone();
    }
    if let Some(speed) = args.replay_speed {
        transport.replay_speed = speed;
    }
    if let Some(attempts) = args.reconnect_attempts {
        transport.reconnect.max_attempts = attempts;
    }

    override_db(config, args.db.as_ref());
    if let Some(journal) = &args.journal {
        config.storage.journal_path = Some(journal.clone());
    }
    if let Some(capture) = &args.capture {
        config.capture.path = Some(capture.clone());
    }
}

/// Open the transport, wire the pipeline and run it to completion.
async fn supervise<K: ReadingSink>(config: &StationConfig, sink: K) -> Result<()> {
    let extractor = FieldExtractor::station().context("Failed to compile field patterns")?;
    let assembler = FrameAssembler::new(Markers::from(&config.framing));

    let mut writer = IngestionWriter::new(sink).with_retry(config.storage.retry.clone());
    if let Some(path) = &config.storage.journal_path {
        writer = writer.with_journal(RecoveryJournal::new(path));
    }

    let source = match open_transport(&config.transport).await {
        Ok(source) => source,
        Err(fault) => {
            if let Err(e) = writer.close().await {
                error!(error = %e, "failed to close store");
            }
            return Err(CliError::from(fault).into());
        }
    };

    let mut supervisor = Supervisor::new(source, assembler, extractor, writer)
        .with_reconnect(config.transport.reconnect.clone());

    if let Some(path) = &config.capture.path {
        match CaptureWriter::open(path).await {
            Ok(capture) => supervisor = supervisor.with_capture(capture),
            Err(e) => warn!(path = %path.display(), error = %e, "capture disabled"),
        }
    }

    info!("Starting ingestion...");
    let report = supervisor.run(shutdown_signal()).await;

    info!(
        reason = %report.reason,
        readings = report.stats.readings_extracted,
        persisted = report.stats.persisted,
        failed = report.stats.write_failures,
        duration_secs = report.stats.duration.as_secs_f64(),
        "Ingestion finished"
    );
    report.stats.print_summary();

    match report.reason {
        ShutdownReason::TransportFault(fault) => Err(CliError::from(fault).into()),
        ShutdownReason::Interrupted | ShutdownReason::EndOfStream => Ok(()),
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, stopping ingestion..."),
        _ = terminate => warn!("Received SIGTERM, stopping ingestion..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["sensor-ingest", "run"];
        full.extend_from_slice(argv);
        match crate::cli::Cli::try_parse_from(full).unwrap().command {
            crate::cli::Commands::Run(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_overrides_select_transport() {
        let mut config = StationConfig::default();
        apply_overrides(&mut config, &run_args(&["--address", "bridge:4000"]));
        assert_eq!(config.transport.kind, TransportKind::Tcp);
        assert_eq!(config.transport.address.as_deref(), Some("bridge:4000"));

        let mut config = StationConfig::default();
        apply_overrides(
            &mut config,
            &run_args(&["--replay", "capture.log", "--replay-speed", "10", "--capture", "out.log"]),
        );
        assert_eq!(config.transport.kind, TransportKind::Replay);
        assert_eq!(config.transport.path, PathBuf::from("capture.log"));
        assert_eq!(config.transport.replay_speed, 10.0);
        assert_eq!(config.capture.path, Some(PathBuf::from("out.log")));
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("readings.db");
        let db_arg = db.display().to_string();

        run_ingest(&run_args(&["--stdin", "--db", db_arg.as_str(), "--dry-run"]))
            .await
            .unwrap();

        assert!(!db.exists());
    }

    #[tokio::test]
    async fn test_invalid_override_is_config_error() {
        let err = run_ingest(&run_args(&["--replay", "a.log", "--replay-speed", "0", "--dry-run"]))
            .await
            .unwrap_err();
        assert_eq!(crate::error::exit_status(&err), 1);
    }

    #[tokio::test]
    async fn test_replay_run_persists_readings() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("capture.log");
        std::fs::write(
            &capture,
            "----- Sensor Readings -----\nTemperature: 22.5\nRain: NO\n---------------------------\n",
        )
        .unwrap();
        let db = dir.path().join("readings.db");
        let capture_arg = capture.display().to_string();
        let db_arg = db.display().to_string();

        run_ingest(&run_args(&["--replay", capture_arg.as_str(), "--db", db_arg.as_str()]))
            .await
            .unwrap();

        let database = writer::Database::open(&db).unwrap();
        let rows = database.recent_readings(10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reading.temperature, Some(22.5));
        assert_eq!(rows[0].reading.rain, Some(false));
        database.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_replay_file_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let db_arg = dir.path().join("readings.db").display().to_string();
        let err = run_ingest(&run_args(&["--replay", "/nonexistent/capture.log", "--db", db_arg.as_str()]))
            .await
            .unwrap_err();
        assert_eq!(crate::error::exit_status(&err), 2);
    }
}
