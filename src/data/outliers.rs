use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::model::{CleanedSet, Field, Observation};
use super::stats;
use crate::error::{EngineError, EngineResult};

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutlierMethod {
    /// Outside `[Q1 - k*IQR, Q3 + k*IQR]`.
    #[serde(rename = "iqr")]
    Iqr,
    /// `|z| > k`, with mean and spread recomputed over the cleaned values.
    #[serde(rename = "zscore")]
    ZScore,
}

impl OutlierMethod {
    pub fn default_k(self) -> f64 {
        match self {
            OutlierMethod::Iqr => 1.5,
            OutlierMethod::ZScore => 3.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutlierMethod::Iqr => "iqr",
            OutlierMethod::ZScore => "zscore",
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutlierMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "zscore" | "z-score" => Ok(OutlierMethod::ZScore),
            _ => Err(EngineError::UnknownMethod(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Raw query parameters for an outlier report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutlierParams {
    pub field: Option<String>,
    pub method: Option<String>,
    pub k: Option<String>,
}

/// A validated outlier request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierRequest {
    pub field: Field,
    pub method: OutlierMethod,
    pub k: f64,
}

impl OutlierRequest {
    /// `k` defaults per method; an explicit one must be finite and non-negative.
    pub fn new(field: Field, method: OutlierMethod, k: Option<f64>) -> EngineResult<Self> {
        let k = match k {
            None => method.default_k(),
            Some(k) if k.is_finite() && k >= 0.0 => k,
            Some(k) => {
                return Err(EngineError::invalid(
                    "k",
                    &k.to_string(),
                    "must be a finite, non-negative number",
                ))
            }
        };
        Ok(Self { field, method, k })
    }

    /// Missing `field` means temperature, missing `method` means IQR.
    pub fn from_params(params: &OutlierParams) -> EngineResult<Self> {
        let field = non_blank(&params.field).unwrap_or("temperature").parse()?;
        let method = non_blank(&params.method).unwrap_or("iqr").parse()?;
        let k = non_blank(&params.k)
            .map(|raw| {
                raw.parse::<f64>()
                    .map_err(|_| EngineError::invalid("k", raw, "expected a number"))
            })
            .transpose()?;
        Self::new(field, method, k)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    pub method: OutlierMethod,
    pub field: Field,
    pub k: f64,
    pub outlier_count: usize,
    pub outliers: Vec<Observation>,
}

/// Flag observations of the cleaned set whose `field` value is an outlier.
///
/// Observations without a value for `field` are never flagged. Results keep
/// store order.
pub fn detect_outliers(set: &CleanedSet, request: &OutlierRequest) -> EngineResult<OutlierReport> {
    if !set.has_field(request.field) {
        return Err(EngineError::UnknownField(request.field.to_string()));
    }
    if set.is_empty() {
        return Err(EngineError::NoData);
    }

    let indexed = set.indexed_values(request.field);
    let values: Vec<f64> = indexed.iter().map(|(_, v)| *v).collect();
    let mask = match request.method {
        OutlierMethod::Iqr => iqr_mask(&values, request.k),
        OutlierMethod::ZScore => zscore_mask(&values, request.k),
    };

    let outliers: Vec<Observation> = indexed
        .iter()
        .zip(mask)
        .filter(|(_, flagged)| *flagged)
        .map(|((idx, _), _)| set.observations[*idx].clone())
        .collect();

    Ok(OutlierReport {
        method: request.method,
        field: request.field,
        k: request.k,
        outlier_count: outliers.len(),
        outliers,
    })
}

fn iqr_mask(values: &[f64], k: f64) -> Vec<bool> {
    let sorted = stats::sorted_copy(values);
    let (Some(q1), Some(q3)) = (
        stats::percentile_sorted(&sorted, 0.25),
        stats::percentile_sorted(&sorted, 0.75),
    ) else {
        return vec![false; values.len()];
    };
    let iqr = q3 - q1;
    let lower = q1 - k * iqr;
    let upper = q3 + k * iqr;
    values.iter().map(|v| *v < lower || *v > upper).collect()
}

fn zscore_mask(values: &[f64], k: f64) -> Vec<bool> {
    stats::z_scores(values)
        .into_iter()
        .map(|z| z.abs() > k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with(field: Field, values: &[Option<f64>]) -> CleanedSet {
        let observations = values
            .iter()
            .map(|v| {
                let mut obs = Observation::empty(None);
                obs.set_value(field, *v);
                obs
            })
            .collect();
        CleanedSet::new(observations, vec![field])
    }

    fn request(field: Field, method: OutlierMethod, k: f64) -> OutlierRequest {
        OutlierRequest::new(field, method, Some(k)).unwrap()
    }

    #[test]
    fn iqr_flags_values_strictly_outside_the_fences() {
        let set = set_with(
            Field::Temperature,
            &[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(7.0), Some(7.5)],
        );
        let report = detect_outliers(&set, &request(Field::Temperature, OutlierMethod::Iqr, 1.0))
            .unwrap();
        // q1 = 2.5, q3 = 6.0, fences [-1.0, 9.5] → nothing
        assert_eq!(report.outlier_count, 0);

        let set = set_with(
            Field::Temperature,
            &[Some(10.0), Some(11.0), Some(12.0), Some(13.0), Some(40.0)],
        );
        let report = detect_outliers(&set, &request(Field::Temperature, OutlierMethod::Iqr, 1.5))
            .unwrap();
        assert_eq!(report.outlier_count, 1);
        assert_eq!(report.outliers[0].temperature, Some(40.0));
    }

    #[test]
    fn zscore_recomputes_over_current_values() {
        let mut values: Vec<Option<f64>> = (0..30).map(|i| Some(20.0 + (i % 5) as f64)).collect();
        values.push(Some(60.0));
        let set = set_with(Field::Salinity, &values);
        let report =
            detect_outliers(&set, &request(Field::Salinity, OutlierMethod::ZScore, 3.0)).unwrap();
        assert_eq!(report.outlier_count, 1);
        assert_eq!(report.outliers[0].salinity, Some(60.0));
    }

    #[test]
    fn constant_field_has_no_outliers() {
        let set = set_with(Field::Odo, &[Some(6.5); 12]);
        for method in [OutlierMethod::Iqr, OutlierMethod::ZScore] {
            let report = detect_outliers(&set, &request(Field::Odo, method, 0.0)).unwrap();
            assert_eq!(report.outlier_count, 0, "{method}");
        }
    }

    #[test]
    fn missing_values_are_skipped_and_order_kept() {
        let set = set_with(
            Field::Latitude,
            &[Some(90.0), None, Some(25.0), Some(25.1), Some(25.0), Some(24.9), Some(-90.0)],
        );
        let report =
            detect_outliers(&set, &request(Field::Latitude, OutlierMethod::Iqr, 1.5)).unwrap();
        let lats: Vec<_> = report.outliers.iter().map(|o| o.latitude).collect();
        assert_eq!(lats, vec![Some(90.0), Some(-90.0)]);
    }

    #[test]
    fn rejects_unknown_inputs() {
        let params = OutlierParams {
            method: Some("mad".into()),
            ..OutlierParams::default()
        };
        assert_eq!(
            OutlierRequest::from_params(&params),
            Err(EngineError::UnknownMethod("mad".into()))
        );

        let params = OutlierParams {
            field: Some("turbidity".into()),
            ..OutlierParams::default()
        };
        assert_eq!(
            OutlierRequest::from_params(&params),
            Err(EngineError::UnknownField("turbidity".into()))
        );

        assert!(OutlierRequest::new(Field::Odo, OutlierMethod::Iqr, Some(-1.0)).is_err());
    }

    #[test]
    fn field_absent_from_schema_is_unknown() {
        let set = set_with(Field::Temperature, &[Some(20.0)]);
        let err = detect_outliers(&set, &request(Field::Odo, OutlierMethod::Iqr, 1.5)).unwrap_err();
        assert_eq!(err, EngineError::UnknownField("odo".into()));
    }

    #[test]
    fn defaults_depend_on_method() {
        let iqr = OutlierRequest::from_params(&OutlierParams::default()).unwrap();
        assert_eq!((iqr.field, iqr.method, iqr.k), (Field::Temperature, OutlierMethod::Iqr, 1.5));

        let params = OutlierParams {
            method: Some("Z-Score".into()),
            ..OutlierParams::default()
        };
        let z = OutlierRequest::from_params(&params).unwrap();
        assert_eq!((z.method, z.k), (OutlierMethod::ZScore, 3.0));
    }

    #[test]
    fn empty_set_reports_no_data() {
        let set = CleanedSet::new(vec![], vec![Field::Temperature]);
        let err = detect_outliers(&set, &request(Field::Temperature, OutlierMethod::Iqr, 1.5))
            .unwrap_err();
        assert_eq!(err, EngineError::NoData);
    }

    #[test]
    fn empty_set_still_rejects_field_outside_schema() {
        let set = CleanedSet::new(vec![], vec![Field::Temperature, Field::Salinity]);
        let err = detect_outliers(&set, &request(Field::Odo, OutlierMethod::ZScore, 3.0))
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownField("odo".into()));
        assert!(err.is_rejected_input());
    }
}
