//! Field extractor
//!
//! Applies the station's field patterns to every line of a completed frame
//! and merges the matches into one [`Reading`].

use contracts::{DecodeFault, Field, FieldKind, FieldValue, Frame, Reading};
use regex::Regex;
use tracing::trace;

use crate::error::FramingError;

/// Patterns printed by the station firmware. The first capture group holds
/// the value.
pub const STATION_PATTERNS: [(Field, &str); 5] = [
    (Field::Temperature, r"Temperature: ([\d.]+)"),
    (Field::Humidity, r"Humidity: ([\d.]+)"),
    (Field::Motion, r"Motion Detected \(PIR\): (YES|NO)"),
    (Field::Rain, r"Rain: (YES|NO)"),
    (Field::SoilMoisture, r"Soil Moisture: (\d+)"),
];

/// A named rule mapping raw text to a typed field value
#[derive(Debug, Clone)]
pub struct Pattern {
    field: Field,
    matcher: Regex,
}

impl Pattern {
    /// Compile a pattern; it must have at least one capture group.
    pub fn new(field: Field, pattern: &str) -> Result<Self, FramingError> {
        let matcher = Regex::new(pattern).map_err(|source| FramingError::InvalidPattern {
            field,
            source,
        })?;
        if matcher.captures_len() < 2 {
            return Err(FramingError::NoCaptureGroup { field });
        }
        Ok(Self { field, matcher })
    }

    pub fn field(&self) -> Field {
        self.field
    }

    /// Captured value of the first match in `text`
    pub fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.matcher
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Decode a captured value into the field's declared type
    pub fn decode(&self, raw: &str) -> Result<FieldValue, DecodeFault> {
        let fault = |message: String| DecodeFault {
            field: self.field,
            raw: raw.to_string(),
            message,
        };

        match self.field.kind() {
            FieldKind::Float => raw
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|e| fault(e.to_string())),
            FieldKind::Integer => raw
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|e| fault(e.to_string())),
            FieldKind::Flag => match raw {
                "YES" => Ok(FieldValue::Flag(true)),
                "NO" => Ok(FieldValue::Flag(false)),
                other => Err(fault(format!("expected YES or NO, got '{other}'"))),
            },
        }
    }
}

/// Result of extracting one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// `None` for an empty frame
    pub reading: Option<Reading>,
    /// Matched values that failed to decode
    pub faults: Vec<DecodeFault>,
}

/// Turns completed frames into readings
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    patterns: Vec<Pattern>,
}

impl FieldExtractor {
    /// Extractor using [`STATION_PATTERNS`]
    pub fn station() -> Result<Self, FramingError> {
        Self::from_table(&STATION_PATTERNS)
    }

    /// Extractor from a `(field, regex)` table
    pub fn from_table(table: &[(Field, &str)]) -> Result<Self, FramingError> {
        let patterns = table
            .iter()
            .map(|(field, pattern)| Pattern::new(*field, pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Extract a reading from a completed frame.
    ///
    /// The reading is stamped with the frame's close time. For each field the
    /// last successfully decoded match wins; a value that fails to decode
    /// leaves the field as it was and is reported in `faults`.
    pub fn extract(&self, frame: Frame) -> Extraction {
        if frame.is_empty() {
            return Extraction {
                reading: None,
                faults: Vec::new(),
            };
        }

        let mut reading = Reading::new(frame.closed_at, frame.raw_text());
        let mut faults = Vec::new();

        for line in &frame.lines {
            for pattern in &self.patterns {
                let Some(raw) = pattern.capture(&line.text) else {
                    continue;
                };
                match pattern.decode(raw) {
                    Ok(value) => {
                        trace!(field = %pattern.field, %value, "field matched");
                        reading.set(pattern.field, value);
                    }
                    Err(fault) => faults.push(fault),
                }
            }
        }

        Extraction {
            reading: Some(reading),
            faults,
        }
    }
}
