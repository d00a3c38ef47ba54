//! `recent` command implementation.

use anyhow::{Context, Result};
use contracts::{Field, FieldValue, Reading};
use tracing::info;
use writer::{Database, StoredReading};

use super::{load_config, override_db};
use crate::cli::RecentArgs;
use crate::error::CliError;

/// Execute the `recent` command
pub async fn run_recent(args: &RecentArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    override_db(&mut config, args.db.as_ref());

    let path = &config.storage.path;
    if !path.exists() {
        return Err(CliError::storage(path.display().to_string(), "database does not exist").into());
    }

    let db = Database::open(path)
        .map_err(|e| CliError::storage(path.display().to_string(), e.to_string()))?;

    let queried = async {
        let total = db.count_readings().await?;
        let rows = db.recent_readings(args.limit).await?;
        Ok::<_, writer::WriterError>((total, rows))
    }
    .await;
    db.shutdown().await.context("Failed to close database")?;
    let (total, rows) = queried.context("Failed to query readings")?;

    info!(total, shown = rows.len(), "Readings loaded");

    if args.json {
        let json = serde_json::to_string_pretty(&rows).context("Failed to serialize readings")?;
        println!("{}", json);
    } else {
        print_table(&rows, total);
    }

    Ok(())
}

fn cell(reading: &Reading, field: Field) -> String {
    reading
        .get(field)
        .map(|value| match value {
            FieldValue::Float(v) => format!("{v:.1}"),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "-".to_string())
}

fn print_table(rows: &[StoredReading], total: u64) {
    if rows.is_empty() {
        println!("No readings stored.");
        return;
    }

    println!(
        "{:>6}  {:<20}  {:>6}  {:>8}  {:>6}  {:>4}  {:>5}",
        "id", "timestamp", "temp", "humidity", "motion", "rain", "soil"
    );
    for row in rows {
        let r = &row.reading;
        println!(
            "{:>6}  {:<20}  {:>6}  {:>8}  {:>6}  {:>4}  {:>5}",
            row.id,
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            cell(r, Field::Temperature),
            cell(r, Field::Humidity),
            cell(r, Field::Motion),
            cell(r, Field::Rain),
            cell(r, Field::SoilMoisture),
        );
    }
    println!("\n{} of {} readings", rows.len(), total);
}
