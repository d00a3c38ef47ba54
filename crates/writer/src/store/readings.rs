use chrono::{DateTime, SecondsFormat, Utc};
use contracts::Reading;
use rusqlite::{params, Row};
use serde::Serialize;

use super::Database;
use crate::error::WriterError;

/// A persisted reading with its surrogate key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredReading {
    pub id: i64,
    #[serde(flatten)]
    pub reading: Reading,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, WriterError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| WriterError::InvalidRow(format!("invalid timestamp '{value}': {err}")))
}

fn stored_from_row(row: &Row<'_>) -> Result<StoredReading, WriterError> {
    let timestamp = parse_timestamp(&row.get::<_, String>(1)?)?;
    Ok(StoredReading {
        id: row.get(0)?,
        reading: Reading {
            timestamp,
            temperature: row.get(2)?,
            humidity: row.get(3)?,
            motion: row.get(4)?,
            rain: row.get(5)?,
            soil_moisture: row.get(6)?,
            raw_text: row.get(7)?,
        },
    })
}

impl Database {
    /// Insert one reading in its own transaction; returns the row id
    pub async fn insert_reading(&self, reading: &Reading) -> Result<i64, WriterError> {
        let record = reading.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO sensor_readings (
                    timestamp,
                    temperature,
                    humidity,
                    motion,
                    rain,
                    soil_moisture,
                    raw_data
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                    record.temperature,
                    record.humidity,
                    record.motion,
                    record.rain,
                    record.soil_moisture,
                    record.raw_text,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })
        .await
    }

    /// Latest `limit` readings, newest first
    pub async fn recent_readings(&self, limit: usize) -> Result<Vec<StoredReading>, WriterError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    id,
                    timestamp,
                    temperature,
                    humidity,
                    motion,
                    rain,
                    soil_moisture,
                    raw_data
                FROM sensor_readings
                ORDER BY id DESC
                LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut readings = Vec::new();
            while let Some(row) = rows.next()? {
                readings.push(stored_from_row(row)?);
            }
            Ok(readings)
        })
        .await
    }

    /// Total number of stored readings
    pub async fn count_readings(&self) -> Result<u64, WriterError> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM sensor_readings", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}
