//! Cleaning, query and analytics engine for water-quality observations
//! recorded by an autonomous surface vehicle.
//!
//! Observations are loaded once from a tabular source, stripped of
//! incomplete rows and z-score outliers, and kept in a [`RecordStore`].
//! Filtered queries, summary statistics and on-demand outlier reports all
//! read from the store's current snapshot.

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod store;

pub use config::{Config, IngestConfig};
pub use error::{EngineError, EngineResult};
pub use store::RecordStore;
