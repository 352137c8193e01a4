use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray,
};
use arrow::datatypes::DataType;
use arrow::util::display::array_value_to_string;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, RawRow, RawTable};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a raw observation table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row plus one observation per line (the sensor export)
/// * `.json`    – `[{ "temperature": 28.1, "salinity": 36.0, ... }, ...]`
/// * `.parquet` – flat scalar columns
pub fn load_file(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    debug!(
        "read {} rows, columns {:?} from {}",
        table.len(),
        table.columns,
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, every other row one observation.
/// Header names are kept verbatim (including padding spaces); normalization
/// happens later. Short rows are accepted, their trailing cells are missing.
fn load_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(col, value)| (col.clone(), guess_cell_type(value)))
            .collect();

        rows.push(row);
    }

    Ok(RawTable::new(headers, rows))
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Temperature (c)": 28.1, "Salinity (ppt)": 36.2, "ODO mg/L": 6.4 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let row: RawRow = obj
            .iter()
            .map(|(key, val)| (key.clone(), json_to_cell(val)))
            .collect();
        rows.push(row);
    }

    Ok(RawTable::from_rows(rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one scalar column per sensor channel.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        for row in 0..batch.num_rows() {
            let cells: RawRow = columns
                .iter()
                .enumerate()
                .map(|(col_idx, name)| (name.clone(), extract_cell(batch.column(col_idx), row)))
                .collect::<BTreeMap<_, _>>();
            rows.push(cells);
        }
    }

    Ok(RawTable::new(columns, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let any = col.as_any();
    let cell = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|s| CellValue::String(s.value(row).to_string())),
        DataType::LargeUtf8 => any
            .downcast_ref::<LargeStringArray>()
            .map(|s| CellValue::String(s.value(row).to_string())),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| CellValue::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| CellValue::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| CellValue::Bool(a.value(row))),
        // Dates, timestamps and anything exotic go through Arrow's formatter.
        _ => array_value_to_string(col.as_ref(), row).ok().map(CellValue::String),
    };
    cell.unwrap_or(CellValue::Null)
}
