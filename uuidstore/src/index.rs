use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::codec::Identifier;
use crate::errors::StoreResult;
use crate::metrics::StoreMetrics;
use crate::store::for_each_record;

/// Occurrence count of every identifier in a store.
///
/// Built once by a full scan and read-only afterwards, so search workers can
/// share it by plain reference. Key and value records count the same.
#[derive(Debug, Clone, Default)]
pub struct FrequencyIndex {
    counts: HashMap<Identifier, usize>,
    total_records: u64,
}

impl FrequencyIndex {
    /// Scans the store at `path` and counts every record
    pub fn build(path: &Path) -> StoreResult<Self> {
        Self::build_with_metrics(path, &StoreMetrics::new())
    }

    /// Like [`FrequencyIndex::build`], reporting the scan to `metrics`
    pub fn build_with_metrics(path: &Path, metrics: &StoreMetrics) -> StoreResult<Self> {
        info!("Building frequency index from {}", path.display());
        let mut index = Self::default();
        let scan = for_each_record(path, |id| index.insert(id))?;
        metrics.record_scan(scan.len, scan.records);
        debug!(
            "Indexed {} records, {} distinct identifiers",
            index.total_records,
            index.distinct()
        );
        Ok(index)
    }

    /// Builds an index from in-memory records
    pub fn from_records(records: impl IntoIterator<Item = Identifier>) -> Self {
        let mut index = Self::default();
        for id in records {
            index.insert(id);
        }
        index
    }

    fn insert(&mut self, id: Identifier) {
        *self.counts.entry(id).or_insert(0) += 1;
        self.total_records += 1;
    }

    /// Number of occurrences of `id`, or `None` if it never appears
    pub fn count(&self, id: &Identifier) -> Option<usize> {
        self.counts.get(id).copied()
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    /// Number of distinct identifiers
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }
}
