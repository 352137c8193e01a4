use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use log::warn;

use super::model::{Field, Observation, RawRow, RawTable};

// ---------------------------------------------------------------------------
// Column mapping: sensor export header → canonical name
// ---------------------------------------------------------------------------

/// Headers as the vehicle's sonde exports them. Matching ignores the padding
/// spaces some exports put around header names.
const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("Latitude", "latitude"),
    ("Longitude", "longitude"),
    ("Temperature (c)", "temperature"),
    ("Salinity (ppt)", "salinity"),
    ("ODO mg/L", "odo"),
    ("Date m/d/y", "date"),
    ("Time hh:mm:ss", "time"),
];

/// Canonical names accepted verbatim.
const CANONICAL: &[&str] = &[
    "latitude",
    "longitude",
    "temperature",
    "salinity",
    "odo",
    "date",
    "time",
    "timestamp",
];

/// First instant of the synthesized clock used when a source has no date/time columns.
pub fn synthetic_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 10, 7)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Map a source header onto its canonical column name, if it has one.
pub fn canonical_name(header: &str) -> Option<&'static str> {
    let trimmed = header.trim();
    COLUMN_MAPPING
        .iter()
        .find(|(source, _)| *source == trimmed)
        .map(|(_, canonical)| *canonical)
        .or_else(|| CANONICAL.iter().copied().find(|c| *c == trimmed))
}

// ---------------------------------------------------------------------------
// Normalized table
// ---------------------------------------------------------------------------

/// Source rows projected onto the canonical schema, in source order.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    /// Canonical numeric fields the source provides, in [`Field::ALL`] order.
    pub fields: Vec<Field>,
    pub rows: Vec<Observation>,
    /// Rows whose date/time text could not be parsed (kept with a null timestamp).
    pub unparsed_timestamps: usize,
}

impl NormalizedTable {
    pub fn required_fields(&self) -> Vec<Field> {
        self.fields.iter().copied().filter(|f| f.is_required()).collect()
    }
}

enum TimestampSource<'a> {
    DateAndTime { date: &'a str, time: &'a str },
    Single(&'a str),
    Synthetic,
}

/// Rename columns, build timestamps and convert numeric cells.
///
/// Columns the source lacks are simply absent from `fields`; it is up to the
/// cleaning pass to decide whether what remains is usable.
pub fn normalize(table: &RawTable) -> NormalizedTable {
    // canonical name → source header (first match wins)
    let mut source_of: BTreeMap<&'static str, &str> = BTreeMap::new();
    for header in &table.columns {
        if let Some(canonical) = canonical_name(header) {
            source_of.entry(canonical).or_insert(header.as_str());
        }
    }

    let fields: Vec<(Field, &str)> = Field::ALL
        .into_iter()
        .filter_map(|f| source_of.get(f.name()).map(|src| (f, *src)))
        .collect();

    let ts_source = match (source_of.get("date"), source_of.get("time")) {
        (Some(date), Some(time)) => TimestampSource::DateAndTime {
            date: *date,
            time: *time,
        },
        _ => match source_of.get("timestamp") {
            Some(col) => TimestampSource::Single(*col),
            None => TimestampSource::Synthetic,
        },
    };

    let epoch = synthetic_epoch();
    let mut unparsed_timestamps = 0;
    let mut rows = Vec::with_capacity(table.len());

    for (i, raw) in table.rows.iter().enumerate() {
        let timestamp = match ts_source {
            TimestampSource::DateAndTime { date, time } => {
                let parsed = combine_date_time(raw, date, time);
                if parsed.is_none() {
                    unparsed_timestamps += 1;
                }
                parsed
            }
            TimestampSource::Single(col) => {
                let parsed = text_cell(raw, col).and_then(|t| parse_timestamp(&t));
                if parsed.is_none() {
                    unparsed_timestamps += 1;
                }
                parsed
            }
            TimestampSource::Synthetic => Some(epoch + Duration::seconds(i as i64)),
        };

        let mut obs = Observation::empty(timestamp);
        for (field, col) in &fields {
            obs.set_value(*field, raw.get(*col).and_then(|c| c.as_f64()));
        }
        rows.push(obs);
    }

    if unparsed_timestamps > 0 {
        warn!("{unparsed_timestamps} rows have an unparseable date/time; keeping them with a null timestamp");
    }

    NormalizedTable {
        fields: fields.into_iter().map(|(f, _)| f).collect(),
        rows,
        unparsed_timestamps,
    }
}

fn text_cell(row: &RawRow, col: &str) -> Option<String> {
    row.get(col).and_then(|c| c.as_text())
}

fn combine_date_time(row: &RawRow, date_col: &str, time_col: &str) -> Option<NaiveDateTime> {
    let date = text_cell(row, date_col)?;
    let time = text_cell(row, time_col)?;
    parse_timestamp(&format!("{} {}", date.trim(), time.trim()))
}

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

/// Two-digit years are tried first: `%Y` would happily read `22` as year 22.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse the date/time layouts seen in sensor exports and in our own ISO output.
/// Offsets in RFC 3339 input are folded into UTC.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}
