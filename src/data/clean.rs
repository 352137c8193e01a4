use std::path::Path;

use anyhow::{Result, bail};
use log::info;

use super::loader;
use super::model::{CleanedSet, Field, Observation, Provenance, RawTable};
use super::schema;
use super::stats;

/// Rows whose |z| reaches this in any required field are rejected at load time.
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// Read `path`, clean it and return the survivors with their provenance.
pub fn clean_and_load(path: &Path, z_threshold: f64) -> Result<(CleanedSet, Provenance)> {
    info!("Loading raw data from {}", path.display());
    let table = loader::load_file(path)?;
    clean_table(&table, z_threshold)
}

/// Run the cleaning pipeline over an already loaded table.
///
/// Fails when the source has no rows or none of the required numeric columns;
/// an empty result after cleaning is not an error.
pub fn clean_table(table: &RawTable, z_threshold: f64) -> Result<(CleanedSet, Provenance)> {
    let normalized = schema::normalize(table);
    let required = normalized.required_fields();

    let original_count = normalized.rows.len();
    if original_count == 0 {
        bail!("source contains no rows");
    }
    if required.is_empty() {
        bail!(
            "source has none of the required columns ({})",
            Field::REQUIRED.map(Field::name).join(", ")
        );
    }
    info!("Original data loaded: {original_count} rows");

    let complete: Vec<Observation> = normalized
        .rows
        .into_iter()
        .filter(|obs| required.iter().all(|f| obs.value(*f).is_some()))
        .collect();
    let incomplete_count = original_count - complete.len();
    info!("After removing missing values: {} rows", complete.len());

    let keep = zscore_keep_mask(&complete, &required, z_threshold);
    let observations: Vec<Observation> = complete
        .into_iter()
        .zip(keep)
        .filter_map(|(obs, keep)| keep.then_some(obs))
        .collect();

    let provenance = Provenance {
        original_count,
        incomplete_count,
        removed_count: original_count - observations.len(),
        z_threshold,
    };
    info!(
        "Data cleaning complete: {} original, {} removed ({} incomplete), {} remaining",
        provenance.original_count,
        provenance.removed_count,
        provenance.incomplete_count,
        provenance.remaining_count()
    );

    Ok((CleanedSet::new(observations, normalized.fields), provenance))
}

/// `true` for rows whose |z| stays below `threshold` in every field.
/// Mean and spread come from `rows` as given, i.e. after the completeness drop.
fn zscore_keep_mask(rows: &[Observation], fields: &[Field], threshold: f64) -> Vec<bool> {
    let mut keep = vec![true; rows.len()];
    for &field in fields {
        let values: Vec<f64> = rows
            .iter()
            .map(|obs| obs.value(field).unwrap_or(f64::NAN))
            .collect();
        for (keep, z) in keep.iter_mut().zip(stats::z_scores(&values)) {
            if z.abs() >= threshold {
                *keep = false;
            }
        }
    }
    keep
}
