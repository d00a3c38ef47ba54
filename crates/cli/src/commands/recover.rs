//! `recover` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};
use writer::{recover_journal, IngestionWriter, RecoveryJournal, SqliteSink};

use super::{load_config, override_db};
use crate::cli::RecoverArgs;
use crate::error::CliError;

/// Execute the `recover` command
pub async fn run_recover(args: &RecoverArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    override_db(&mut config, args.db.as_ref());

    let journal_path = args
        .journal
        .clone()
        .or_else(|| config.storage.journal_path.clone())
        .ok_or_else(|| {
            CliError::config_invalid("no journal configured (storage.journal_path or --journal)")
        })?;
    let journal = RecoveryJournal::new(&journal_path);

    let path = &config.storage.path;
    let sink = SqliteSink::open(path)
        .map_err(|e| CliError::storage(path.display().to_string(), e.to_string()))?;

    // No journal on this writer: entries that fail again stay in the source file
    let mut writer = IngestionWriter::new(sink).with_retry(config.storage.retry.clone());

    info!(journal = %journal_path.display(), database = %path.display(), "Recovering journal");
    let recovered = recover_journal(&journal, &mut writer).await;
    writer.close().await.context("Failed to close store")?;
    let report = recovered.context("Journal recovery failed")?;

    println!(
        "Recovered {} of {} journaled readings ({} still failing)",
        report.inserted, report.entries, report.failed
    );
    if report.failed > 0 {
        warn!(
            failed = report.failed,
            journal = %journal_path.display(),
            "Some readings are still in the journal"
        );
    }

    Ok(())
}
