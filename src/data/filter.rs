use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::model::{Field, Observation};
use super::schema::parse_timestamp;
use crate::error::{EngineError, EngineResult};

/// Page size when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 100;
/// Hard ceiling on a page, whatever the caller asks for.
pub const MAX_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// Bounds – an optional inclusive range
// ---------------------------------------------------------------------------

/// Inclusive `[min, max]` range where either side may be open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for Bounds<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// A missing value passes an unbounded range and fails any other.
    pub fn admits(&self, value: Option<T>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(v) = value else {
            return false;
        };
        self.min.map_or(true, |lo| v >= lo) && self.max.map_or(true, |hi| v <= hi)
    }
}

// ---------------------------------------------------------------------------
// FilterSpec – one validated query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub time: Bounds<NaiveDateTime>,
    pub temperature: Bounds<f64>,
    pub salinity: Bounds<f64>,
    pub odo: Bounds<f64>,
    /// Already clamped to [`MAX_LIMIT`].
    pub limit: usize,
    pub skip: usize,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            time: Bounds::default(),
            temperature: Bounds::default(),
            salinity: Bounds::default(),
            odo: Bounds::default(),
            limit: DEFAULT_LIMIT,
            skip: 0,
        }
    }
}

impl FilterSpec {
    /// Set the page size, clamping into `[0, MAX_LIMIT]`.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit.clamp(0, MAX_LIMIT as i64) as usize;
        self
    }

    /// Set the offset; negative offsets mean "from the start".
    pub fn with_skip(mut self, skip: i64) -> Self {
        self.skip = skip.max(0) as usize;
        self
    }

    pub fn with_range(mut self, field: Field, bounds: Bounds<f64>) -> Self {
        match field {
            Field::Temperature => self.temperature = bounds,
            Field::Salinity => self.salinity = bounds,
            Field::Odo => self.odo = bounds,
            // Position is not filterable.
            Field::Latitude | Field::Longitude => {}
        }
        self
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        self.time.admits(obs.timestamp)
            && self.temperature.admits(obs.temperature)
            && self.salinity.admits(obs.salinity)
            && self.odo.admits(obs.odo)
    }

    /// Validate raw query parameters.
    pub fn from_params(params: &FilterParams) -> EngineResult<Self> {
        let start = parse_opt("start", params.start.as_deref(), |s| {
            parse_time_bound(s, TimeEdge::Start)
        })?;
        let end = parse_opt("end", params.end.as_deref(), |s| {
            parse_time_bound(s, TimeEdge::End)
        })?;

        let mut spec = FilterSpec {
            time: Bounds::new(start, end),
            temperature: float_bounds("min_temp", &params.min_temp, "max_temp", &params.max_temp)?,
            salinity: float_bounds("min_sal", &params.min_sal, "max_sal", &params.max_sal)?,
            odo: float_bounds("min_odo", &params.min_odo, "max_odo", &params.max_odo)?,
            ..FilterSpec::default()
        };
        if let Some(limit) = parse_opt("limit", params.limit.as_deref(), parse_int)? {
            spec = spec.with_limit(limit);
        }
        if let Some(skip) = parse_opt("skip", params.skip.as_deref(), parse_int)? {
            spec = spec.with_skip(skip);
        }
        Ok(spec)
    }
}

// ---------------------------------------------------------------------------
// Raw parameters
// ---------------------------------------------------------------------------

/// Query parameters as they arrive, before validation. Blank values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub min_temp: Option<String>,
    pub max_temp: Option<String>,
    pub min_sal: Option<String>,
    pub max_sal: Option<String>,
    pub min_odo: Option<String>,
    pub max_odo: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
}

fn parse_opt<T>(
    name: &str,
    raw: Option<&str>,
    parse: impl Fn(&str) -> Result<T, String>,
) -> EngineResult<Option<T>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse(text)
            .map(Some)
            .map_err(|reason| EngineError::invalid(name, text, reason)),
    }
}

fn parse_float(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err("must be a finite number".to_string()),
        Err(_) => Err("expected a number".to_string()),
    }
}

fn parse_int(s: &str) -> Result<i64, String> {
    s.parse::<i64>().map_err(|_| "expected an integer".to_string())
}

fn float_bounds(
    min_name: &str,
    min: &Option<String>,
    max_name: &str,
    max: &Option<String>,
) -> EngineResult<Bounds<f64>> {
    Ok(Bounds::new(
        parse_opt(min_name, min.as_deref(), parse_float)?,
        parse_opt(max_name, max.as_deref(), parse_float)?,
    ))
}

#[derive(Clone, Copy)]
enum TimeEdge {
    Start,
    End,
}

/// A bare date covers the whole day: midnight as a start, last instant as an end.
fn parse_time_bound(s: &str, edge: TimeEdge) -> Result<NaiveDateTime, String> {
    if let Some(ts) = parse_timestamp(s) {
        return Ok(ts);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| "expected an ISO-8601 date or date-time".to_string())?;
    let time = match edge {
        TimeEdge::Start => NaiveTime::from_hms_opt(0, 0, 0),
        TimeEdge::End => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999),
    };
    time.map(|t| date.and_time(t))
        .ok_or_else(|| "invalid time of day".to_string())
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// One page of matches plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPage {
    /// All matches, independent of paging.
    pub count: usize,
    pub returned: usize,
    pub items: Vec<Observation>,
}

/// Return the page of observations passing all active bounds, in store order.
pub fn query(observations: &[Observation], spec: &FilterSpec) -> QueryPage {
    let mut count = 0;
    let mut items = Vec::new();
    for obs in observations.iter().filter(|obs| spec.matches(obs)) {
        if count >= spec.skip && items.len() < spec.limit {
            items.push(obs.clone());
        }
        count += 1;
    }
    QueryPage {
        count,
        returned: items.len(),
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::synthetic_epoch;

    fn observations(temps: &[f64]) -> Vec<Observation> {
        temps
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mut obs =
                    Observation::empty(Some(synthetic_epoch() + chrono::Duration::hours(i as i64)));
                obs.set_value(Field::Temperature, Some(*t));
                obs.set_value(Field::Salinity, Some(35.0));
                obs
            })
            .collect()
    }

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        let mut p = FilterParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "start" => p.start = v,
                "end" => p.end = v,
                "min_temp" => p.min_temp = v,
                "max_temp" => p.max_temp = v,
                "min_sal" => p.min_sal = v,
                "max_sal" => p.max_sal = v,
                "limit" => p.limit = v,
                "skip" => p.skip = v,
                other => panic!("unexpected key {other}"),
            }
        }
        p
    }

    #[test]
    fn one_sided_bounds_are_open_on_the_other_side() {
        let b = Bounds::new(Some(25.0), None);
        assert!(b.admits(Some(25.0)));
        assert!(b.admits(Some(1e9)));
        assert!(!b.admits(Some(24.9)));
        assert!(!b.admits(None));
        assert!(Bounds::<f64>::default().admits(None));
    }

    #[test]
    fn count_is_independent_of_paging() {
        let obs = observations(&[20.0, 25.0, 26.0, 27.0, 28.0, 29.0, 30.0, 31.0, 24.0]);
        let spec = FilterSpec::from_params(&params(&[
            ("min_temp", "25"),
            ("max_temp", "30"),
            ("limit", "2"),
            ("skip", "1"),
        ]))
        .unwrap();
        let page = query(&obs, &spec);
        assert_eq!(page.count, 6);
        assert_eq!(page.returned, 2);
        let temps: Vec<_> = page.items.iter().map(|o| o.temperature.unwrap()).collect();
        assert_eq!(temps, vec![26.0, 27.0]);
    }

    #[test]
    fn skip_past_the_end_returns_nothing() {
        let obs = observations(&[20.0, 21.0]);
        let page = query(&obs, &FilterSpec::default().with_skip(5));
        assert_eq!(page.count, 2);
        assert_eq!(page.returned, 0);
    }

    #[test]
    fn limit_is_clamped_and_skip_floored() {
        let spec = FilterSpec::from_params(&params(&[("limit", "5000"), ("skip", "-3")])).unwrap();
        assert_eq!(spec.limit, MAX_LIMIT);
        assert_eq!(spec.skip, 0);
        assert_eq!(FilterSpec::default().limit, DEFAULT_LIMIT);
    }

    #[test]
    fn date_only_end_covers_the_whole_day() {
        let obs = observations(&[20.0; 30]); // hourly from 2022-10-07T00:00
        let spec = FilterSpec::from_params(&params(&[
            ("start", "2022-10-07"),
            ("end", "2022-10-07"),
            ("limit", "1000"),
        ]))
        .unwrap();
        assert_eq!(query(&obs, &spec).count, 24);

        let spec = FilterSpec::from_params(&params(&[("start", "2022-10-08T03:00:00")])).unwrap();
        assert_eq!(query(&obs, &spec).count, 3);
    }

    #[test]
    fn null_timestamps_fail_an_active_time_bound() {
        let mut obs = observations(&[20.0]);
        obs[0].timestamp = None;
        let spec = FilterSpec::from_params(&params(&[("start", "2000-01-01")])).unwrap();
        assert_eq!(query(&obs, &spec).count, 0);
        assert_eq!(query(&obs, &FilterSpec::default()).count, 1);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = FilterSpec::from_params(&params(&[("min_temp", "warm")])).unwrap_err();
        assert!(err.is_rejected_input());
        assert!(matches!(err, EngineError::InvalidParameter { ref name, .. } if name == "min_temp"));
        assert!(FilterSpec::from_params(&params(&[("end", "yesterday")])).is_err());
        assert!(FilterSpec::from_params(&params(&[("limit", "ten")])).is_err());
        assert!(FilterSpec::from_params(&params(&[("max_sal", "NaN")])).is_err());
    }

    #[test]
    fn blank_values_are_ignored() {
        let spec = FilterSpec::from_params(&params(&[("min_sal", " "), ("limit", "")])).unwrap();
        assert_eq!(spec, FilterSpec::default());
    }

    #[test]
    fn no_match_is_an_empty_page() {
        let obs = observations(&[20.0, 21.0]);
        let spec = FilterSpec::default().with_range(Field::Temperature, Bounds::new(Some(50.0), None));
        let page = query(&obs, &spec);
        assert_eq!(page, QueryPage { count: 0, returned: 0, items: vec![] });
    }
}
