/// Data layer: core types, loading, cleaning and the read-side engines.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  schema   │  rename columns, build timestamps → Observation rows
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  clean    │  drop incomplete rows, one-shot z-score rejection
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │  CleanedSet   │  Vec<Observation>, numeric schema, Provenance
///   └──────────────┘
///        │
///        ├──▶ filter    range predicates + paging
///        ├──▶ stats     count / mean / std / quartiles
///        └──▶ outliers  IQR or z-score on demand
/// ```

pub mod clean;
pub mod filter;
pub mod loader;
pub mod model;
pub mod outliers;
pub mod schema;
pub mod stats;
