//! Reading - Field Extractor output, Ingestion Writer input

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five telemetry fields reported by the station firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Temperature,
    Humidity,
    Motion,
    Rain,
    SoilMoisture,
}

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Decimal number
    Float,
    /// YES / NO flag
    Flag,
    /// Whole number
    Integer,
}

impl Field {
    /// All fields in schema order
    pub const ALL: [Field; 5] = [
        Field::Temperature,
        Field::Humidity,
        Field::Motion,
        Field::Rain,
        Field::SoilMoisture,
    ];

    /// Column / log name
    pub fn name(&self) -> &'static str {
        match self {
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Motion => "motion",
            Field::Rain => "rain",
            Field::SoilMoisture => "soil_moisture",
        }
    }

    /// Declared value type
    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Temperature | Field::Humidity => FieldKind::Float,
            Field::Motion | Field::Rain => FieldKind::Flag,
            Field::SoilMoisture => FieldKind::Integer,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Flag(bool),
    Integer(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Flag(true) => f.write_str("YES"),
            FieldValue::Flag(false) => f.write_str("NO"),
            FieldValue::Integer(v) => write!(f, "{v}"),
        }
    }
}

/// One structured reading extracted from one completed frame.
///
/// Every optional field is `None` when no line of the frame matched its
/// pattern. Absence is never replaced by a default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Close time of the source frame
    pub timestamp: DateTime<Utc>,

    /// Degrees Celsius
    pub temperature: Option<f64>,

    /// Relative humidity, percent
    pub humidity: Option<f64>,

    /// PIR motion detected
    pub motion: Option<bool>,

    /// Rain detected
    pub rain: Option<bool>,

    /// Raw soil moisture ADC value
    pub soil_moisture: Option<i64>,

    /// Newline-joined frame lines, markers excluded
    pub raw_text: String,
}

impl Reading {
    /// Create a reading with every field absent
    pub fn new(timestamp: DateTime<Utc>, raw_text: impl Into<String>) -> Self {
        Self {
            timestamp,
            temperature: None,
            humidity: None,
            motion: None,
            rain: None,
            soil_moisture: None,
            raw_text: raw_text.into(),
        }
    }

    /// Set a field from a decoded value.
    ///
    /// A value whose type does not match the field's declared kind is ignored.
    pub fn set(&mut self, field: Field, value: FieldValue) {
        match (field, value) {
            (Field::Temperature, FieldValue::Float(v)) => self.temperature = Some(v),
            (Field::Humidity, FieldValue::Float(v)) => self.humidity = Some(v),
            (Field::Motion, FieldValue::Flag(v)) => self.motion = Some(v),
            (Field::Rain, FieldValue::Flag(v)) => self.rain = Some(v),
            (Field::SoilMoisture, FieldValue::Integer(v)) => self.soil_moisture = Some(v),
            _ => {}
        }
    }

    /// Get a field value, `None` when absent
    pub fn get(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Temperature => self.temperature.map(FieldValue::Float),
            Field::Humidity => self.humidity.map(FieldValue::Float),
            Field::Motion => self.motion.map(FieldValue::Flag),
            Field::Rain => self.rain.map(FieldValue::Flag),
            Field::SoilMoisture => self.soil_moisture.map(FieldValue::Integer),
        }
    }

    /// Number of fields carrying a value
    pub fn present_count(&self) -> usize {
        Field::ALL
            .iter()
            .filter(|field| self.get(**field).is_some())
            .count()
    }
}

/// Acknowledgment of a persisted reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Surrogate key assigned by the store, if it assigns one
    pub record_id: Option<i64>,
}

impl Ack {
    /// Ack carrying a store-assigned id
    pub fn stored(record_id: i64) -> Self {
        Self {
            record_id: Some(record_id),
        }
    }

    /// Ack from a sink that assigns no id
    pub fn unkeyed() -> Self {
        Self { record_id: None }
    }
}
