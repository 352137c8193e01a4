//! Descriptive statistics over the cleaned observations.
//!
//! Kernels:
//!
//! - **Standard deviation**: sample (`n - 1`) form, accumulated with
//!   Welford's method. Undefined below two values.
//! - **Percentiles**: linear interpolation between order statistics
//!   (position `q * (n - 1)`).
//! - **Z-scores**: `(x - mean) / std`; a field with no spread (or fewer than
//!   two values) scores every value as `0`.

use std::collections::BTreeMap;

use serde::Serialize;

use super::model::{CleanedSet, Field};
use crate::error::{EngineError, EngineResult};

// ---------------------------------------------------------------------------
// Kernels
// ---------------------------------------------------------------------------

/// Running mean / sum of squared deviations.
#[derive(Debug, Clone, Copy, Default)]
struct Welford {
    n: usize,
    mean: f64,
    m2: f64,
}

impl Welford {
    fn push(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn sample_std(&self) -> Option<f64> {
        (self.n >= 2).then(|| (self.m2 / (self.n - 1) as f64).sqrt())
    }
}

fn accumulate(values: &[f64]) -> Welford {
    let mut acc = Welford::default();
    for &v in values {
        acc.push(v);
    }
    acc
}

pub fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| accumulate(values).mean)
}

/// Sample standard deviation; `None` with fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    accumulate(values).sample_std()
}

/// Linear-interpolation percentile of an ascending slice, `q` in `[0, 1]`.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Per-value z-scores. Degenerate spread yields all zeros, so such a field can
/// never push a value over any positive threshold.
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    let acc = accumulate(values);
    match acc.sample_std() {
        Some(std) if std.is_finite() && std > 0.0 => {
            values.iter().map(|x| (x - acc.mean) / std).collect()
        }
        _ => vec![0.0; values.len()],
    }
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Descriptive statistics for one field. `std` is NaN (serialized as `null`)
/// when fewer than two values exist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

pub type SummaryStatistics = BTreeMap<Field, FieldSummary>;

/// Describe a sample. `None` for an empty one.
pub fn describe(values: &[f64]) -> Option<FieldSummary> {
    let sorted = sorted_copy(values);
    let acc = accumulate(&sorted);
    Some(FieldSummary {
        count: sorted.len(),
        mean: mean(&sorted)?,
        std: acc.sample_std().unwrap_or(f64::NAN),
        min: *sorted.first()?,
        p25: percentile_sorted(&sorted, 0.25)?,
        p50: percentile_sorted(&sorted, 0.50)?,
        p75: percentile_sorted(&sorted, 0.75)?,
        max: *sorted.last()?,
    })
}

/// Statistics for every required field of the cleaned set.
pub fn summary_statistics(set: &CleanedSet) -> EngineResult<SummaryStatistics> {
    let fields = set.required_fields();
    if set.is_empty() || fields.is_empty() {
        return Err(EngineError::NoData);
    }

    let stats: SummaryStatistics = fields
        .into_iter()
        .filter_map(|field| describe(&set.values(field)).map(|s| (field, s)))
        .collect();

    if stats.is_empty() {
        return Err(EngineError::NoData);
    }
    Ok(stats)
}
