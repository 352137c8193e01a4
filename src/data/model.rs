use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// CellValue – a single cell of a raw source table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value as read from CSV, JSON or Parquet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Interpret the cell as a finite `f64`. NaN / infinite readings count as missing.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            CellValue::Float(v) => *v,
            CellValue::Integer(i) => *i as f64,
            CellValue::String(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Bool(_) | CellValue::Null => return None,
        };
        v.is_finite().then_some(v)
    }

    /// Text form of the cell, `None` for nulls and blank strings.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::String(s) if s.trim().is_empty() => None,
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – the source rows before normalization
// ---------------------------------------------------------------------------

pub type RawRow = BTreeMap<String, CellValue>;

/// Rows exactly as the loader read them, keyed by source column name.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Source column names in first-seen order.
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { columns, rows }
    }

    /// Build the column index from the rows themselves (for schemaless sources).
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for col in row.keys() {
                if !columns.contains(col) {
                    columns.push(col.clone());
                }
            }
        }
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Field – the canonical numeric columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Latitude,
    Longitude,
    Temperature,
    Salinity,
    Odo,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Latitude,
        Field::Longitude,
        Field::Temperature,
        Field::Salinity,
        Field::Odo,
    ];

    /// Fields a row must carry to survive cleaning (when the source has them).
    pub const REQUIRED: [Field; 3] = [Field::Temperature, Field::Salinity, Field::Odo];

    pub fn name(self) -> &'static str {
        match self {
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::Temperature => "temperature",
            Field::Salinity => "salinity",
            Field::Odo => "odo",
        }
    }

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| EngineError::UnknownField(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Observation – one cleaned sensor reading
// ---------------------------------------------------------------------------

/// A single observation (one row of the source table after normalization).
///
/// Columns the source did not provide stay `None` and are left out of the
/// serialized form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Serialized as ISO-8601 without offset; `null` when the source value did not parse.
    pub timestamp: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salinity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odo: Option<f64>,
}

impl Observation {
    pub fn empty(timestamp: Option<NaiveDateTime>) -> Self {
        Self {
            timestamp,
            latitude: None,
            longitude: None,
            temperature: None,
            salinity: None,
            odo: None,
        }
    }

    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::Latitude => self.latitude,
            Field::Longitude => self.longitude,
            Field::Temperature => self.temperature,
            Field::Salinity => self.salinity,
            Field::Odo => self.odo,
        }
    }

    pub fn set_value(&mut self, field: Field, value: Option<f64>) {
        let slot = match field {
            Field::Latitude => &mut self.latitude,
            Field::Longitude => &mut self.longitude,
            Field::Temperature => &mut self.temperature,
            Field::Salinity => &mut self.salinity,
            Field::Odo => &mut self.odo,
        };
        *slot = value;
    }
}

// ---------------------------------------------------------------------------
// CleanedSet – the observations that survived ingestion
// ---------------------------------------------------------------------------

/// The cleaned observations plus the numeric schema the source provided.
#[derive(Debug, Clone, Default)]
pub struct CleanedSet {
    /// Observations in source row order.
    pub observations: Vec<Observation>,
    /// Canonical numeric fields present in the source, in [`Field::ALL`] order.
    pub fields: Vec<Field>,
}

impl CleanedSet {
    pub fn new(observations: Vec<Observation>, fields: Vec<Field>) -> Self {
        Self {
            observations,
            fields,
        }
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    pub fn required_fields(&self) -> Vec<Field> {
        self.fields.iter().copied().filter(|f| f.is_required()).collect()
    }

    /// Non-missing values of `field`, each paired with its observation index.
    pub fn indexed_values(&self, field: Field) -> Vec<(usize, f64)> {
        self.observations
            .iter()
            .enumerate()
            .filter_map(|(i, obs)| obs.value(field).map(|v| (i, v)))
            .collect()
    }

    pub fn values(&self, field: Field) -> Vec<f64> {
        self.observations
            .iter()
            .filter_map(|obs| obs.value(field))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Provenance – what the cleaning pass did
// ---------------------------------------------------------------------------

/// Counters recorded once per ingestion run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Provenance {
    /// Rows read from the source.
    pub original_count: usize,
    /// Rows dropped for missing a required value (included in `removed_count`).
    pub incomplete_count: usize,
    /// Rows excluded by cleaning, whether incomplete or outlying.
    pub removed_count: usize,
    /// Z-score threshold the cleaning pass used.
    pub z_threshold: f64,
}

impl Provenance {
    pub fn remaining_count(&self) -> usize {
        self.original_count - self.removed_count
    }

    pub fn summary(&self) -> CleaningSummary {
        CleaningSummary {
            original_rows: self.original_count,
            rows_removed: self.removed_count,
            rows_remaining: self.remaining_count(),
            cleaning_method: format!("z-score with threshold {:.1}", self.z_threshold),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningSummary {
    pub original_rows: usize,
    pub rows_removed: usize,
    pub rows_remaining: usize,
    pub cleaning_method: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_values_parse_as_finite_numbers_only() {
        assert_eq!(CellValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(CellValue::String(" 28.5 ".into()).as_f64(), Some(28.5));
        assert_eq!(CellValue::Float(f64::NAN).as_f64(), None);
        assert_eq!(CellValue::String("n/a".into()).as_f64(), None);
        assert_eq!(CellValue::Null.as_f64(), None);
    }

    #[test]
    fn field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.name().parse::<Field>().unwrap(), field);
        }
        assert_eq!(
            "pressure".parse::<Field>(),
            Err(EngineError::UnknownField("pressure".into()))
        );
    }

    #[test]
    fn absent_columns_are_not_serialized() {
        let mut obs = Observation::empty(None);
        obs.set_value(Field::Temperature, Some(27.0));
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json, serde_json::json!({"timestamp": null, "temperature": 27.0}));
    }

    #[test]
    fn provenance_summary_reports_threshold() {
        let prov = Provenance {
            original_count: 10,
            incomplete_count: 1,
            removed_count: 3,
            z_threshold: 3.0,
        };
        let summary = prov.summary();
        assert_eq!(summary.rows_remaining, 7);
        assert_eq!(summary.cleaning_method, "z-score with threshold 3.0");
    }
}
