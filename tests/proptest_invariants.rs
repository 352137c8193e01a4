use asv_quality::data::clean::clean_table;
use asv_quality::data::filter::{query, Bounds, FilterSpec};
use asv_quality::data::model::{CellValue, CleanedSet, Field, Observation, RawRow, RawTable};
use asv_quality::data::outliers::{detect_outliers, OutlierMethod, OutlierRequest};
use asv_quality::data::stats;
use proptest::prelude::*;

const COLUMNS: [&str; 3] = ["Temperature (c)", "Salinity (ppt)", "ODO mg/L"];

fn raw_table(rows: &[(Option<f64>, Option<f64>, Option<f64>)]) -> RawTable {
    let rows = rows
        .iter()
        .map(|(t, s, o)| {
            COLUMNS
                .iter()
                .zip([t, s, o])
                .map(|(col, v)| {
                    (col.to_string(), v.map(CellValue::Float).unwrap_or(CellValue::Null))
                })
                .collect::<RawRow>()
        })
        .collect();
    RawTable::new(COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
}

fn temperature_set(values: &[f64]) -> CleanedSet {
    let observations = values
        .iter()
        .map(|t| {
            let mut obs = Observation::empty(None);
            obs.set_value(Field::Temperature, Some(*t));
            obs
        })
        .collect();
    CleanedSet::new(observations, vec![Field::Temperature])
}

fn reading() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![9 => (-50.0f64..50.0).prop_map(Some), 1 => Just(None)]
}

proptest! {
    #[test]
    fn cleaning_accounts_for_every_row(
        rows in prop::collection::vec((reading(), reading(), reading()), 1..120),
        threshold in 0.5f64..5.0,
    ) {
        let (set, prov) = clean_table(&raw_table(&rows), threshold).unwrap();
        prop_assert_eq!(prov.original_count, rows.len());
        prop_assert_eq!(prov.removed_count + set.len(), prov.original_count);
        prop_assert!(prov.incomplete_count <= prov.removed_count);
        for obs in &set.observations {
            for field in Field::REQUIRED {
                prop_assert!(obs.value(field).is_some());
            }
        }
    }

    #[test]
    fn survivors_sit_inside_the_threshold_in_every_field(
        rows in prop::collection::vec(
            (-50.0f64..50.0, 30.0f64..40.0, 0.0f64..12.0),
            2..120,
        ),
        spikes in prop::collection::vec((0usize..120, 0usize..3, 100.0f64..1000.0), 0..4),
    ) {
        let mut rows = rows;
        for (at, field, value) in spikes {
            let n = rows.len();
            let row = &mut rows[at % n];
            match field {
                0 => row.0 = value,
                1 => row.1 = value,
                _ => row.2 = value,
            }
        }
        let raw: Vec<_> = rows.iter().map(|(t, s, o)| (Some(*t), Some(*s), Some(*o))).collect();
        let (set, _) = clean_table(&raw_table(&raw), 3.0).unwrap();

        // scores against the pre-cleaning distribution, one mask per field
        let column = |pick: fn(&(f64, f64, f64)) -> f64| -> Vec<f64> {
            rows.iter().map(pick).collect()
        };
        let masks: Vec<Vec<bool>> = [
            column(|r| r.0),
            column(|r| r.1),
            column(|r| r.2),
        ]
        .iter()
        .map(|values| stats::z_scores(values).iter().map(|z| z.abs() < 3.0).collect())
        .collect();

        let expected: Vec<(f64, f64, f64)> = rows
            .iter()
            .enumerate()
            .filter(|(i, _)| masks.iter().all(|mask| mask[*i]))
            .map(|(_, r)| *r)
            .collect();
        let kept: Vec<(f64, f64, f64)> = set
            .observations
            .iter()
            .map(|o| {
                (
                    o.temperature.unwrap_or(f64::NAN),
                    o.salinity.unwrap_or(f64::NAN),
                    o.odo.unwrap_or(f64::NAN),
                )
            })
            .collect();
        prop_assert_eq!(kept, expected);
    }

    #[test]
    fn paging_follows_count(
        temps in prop::collection::vec(0.0f64..40.0, 0..200),
        min in 0.0f64..40.0,
        limit in -5i64..1500,
        skip in -5i64..250,
    ) {
        let set = temperature_set(&temps);
        let spec = FilterSpec::default()
            .with_range(Field::Temperature, Bounds::new(Some(min), None))
            .with_limit(limit)
            .with_skip(skip);
        let page = query(&set.observations, &spec);

        let count = temps.iter().filter(|t| **t >= min).count();
        let limit = limit.clamp(0, 1000) as usize;
        let skip = skip.max(0) as usize;
        prop_assert_eq!(page.count, count);
        prop_assert_eq!(page.returned, limit.min(count.saturating_sub(skip)));
        prop_assert_eq!(page.items.len(), page.returned);
        prop_assert!(page.items.iter().all(|o| o.temperature.is_some_and(|t| t >= min)));

        let unpaged = query(&set.observations, &FilterSpec::default()
            .with_range(Field::Temperature, Bounds::new(Some(min), None)));
        prop_assert_eq!(unpaged.count, page.count);
    }

    #[test]
    fn wider_iqr_fences_flag_fewer(
        temps in prop::collection::vec(-50.0f64..50.0, 1..150),
        k1 in 0.0f64..4.0,
        dk in 0.0f64..4.0,
    ) {
        let set = temperature_set(&temps);
        let narrow = OutlierRequest::new(Field::Temperature, OutlierMethod::Iqr, Some(k1)).unwrap();
        let wide =
            OutlierRequest::new(Field::Temperature, OutlierMethod::Iqr, Some(k1 + dk)).unwrap();
        let narrow = detect_outliers(&set, &narrow).unwrap();
        let wide = detect_outliers(&set, &wide).unwrap();
        prop_assert!(wide.outlier_count <= narrow.outlier_count);
    }

    #[test]
    fn constant_field_never_has_outliers(
        value in -50.0f64..50.0,
        n in 1usize..80,
        k in 0.0f64..5.0,
    ) {
        let set = temperature_set(&vec![value; n]);
        for method in [OutlierMethod::Iqr, OutlierMethod::ZScore] {
            let request = OutlierRequest::new(Field::Temperature, method, Some(k)).unwrap();
            prop_assert_eq!(detect_outliers(&set, &request).unwrap().outlier_count, 0);
        }
    }
}
