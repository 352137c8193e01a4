use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use log::info;

use crate::config::IngestConfig;
use crate::data::clean;
use crate::data::filter::{self, FilterSpec, QueryPage};
use crate::data::model::{CleanedSet, CleaningSummary, Provenance};
use crate::data::outliers::{self, OutlierReport, OutlierRequest};
use crate::data::stats::{self, SummaryStatistics};
use crate::error::{EngineError, EngineResult};

// ---------------------------------------------------------------------------
// Snapshot – one complete ingestion result
// ---------------------------------------------------------------------------

/// An immutable, complete result of one ingestion run.
#[derive(Debug)]
pub struct Snapshot {
    pub data: CleanedSet,
    pub provenance: Provenance,
}

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

/// Owns the cleaned observations and serves the read-side operations.
///
/// A (re)load builds a whole new [`Snapshot`] first and only then swaps it in,
/// so readers see either the previous data or the new data, never a mix.
/// Readers hold an `Arc` to the snapshot they started with; the lock is only
/// taken long enough to clone it.
#[derive(Debug, Default)]
pub struct RecordStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl RecordStore {
    /// An empty store that answers [`EngineError::NotReady`] until loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run ingestion once and return a ready store.
    pub fn load(config: &IngestConfig) -> Result<Self> {
        let store = Self::new();
        store.reload(config)?;
        Ok(store)
    }

    pub fn with_data(data: CleanedSet, provenance: Provenance) -> Self {
        let store = Self::new();
        store.replace(data, provenance);
        store
    }

    /// Re-run ingestion. On failure the current snapshot stays in place.
    pub fn reload(&self, config: &IngestConfig) -> Result<Provenance> {
        let (data, provenance) = clean::clean_and_load(&config.data_file, config.z_threshold)?;
        self.replace(data, provenance);
        Ok(provenance)
    }

    /// Swap in a new snapshot (clear + bulk insert as one step).
    pub fn replace(&self, data: CleanedSet, provenance: Provenance) {
        let stored = data.len();
        let snapshot = Arc::new(Snapshot { data, provenance });
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
        info!("Stored {stored} cleaned observations");
    }

    pub fn is_ready(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The snapshot current at the time of the call.
    pub fn snapshot(&self) -> EngineResult<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(EngineError::NotReady)
    }

    pub fn query(&self, spec: &FilterSpec) -> EngineResult<QueryPage> {
        let snapshot = self.snapshot()?;
        Ok(filter::query(&snapshot.data.observations, spec))
    }

    pub fn summary_statistics(&self) -> EngineResult<SummaryStatistics> {
        stats::summary_statistics(&self.snapshot()?.data)
    }

    pub fn detect_outliers(&self, request: &OutlierRequest) -> EngineResult<OutlierReport> {
        outliers::detect_outliers(&self.snapshot()?.data, request)
    }

    pub fn cleaning_summary(&self) -> EngineResult<CleaningSummary> {
        Ok(self.snapshot()?.provenance.summary())
    }
}
