use dashmap::DashMap;
use std::num::NonZeroUsize;
use std::sync::mpsc;
use std::time::Instant;
use tracing::{debug, info};

use crate::codec::Identifier;
use crate::config::StoreConfig;
use crate::errors::{StoreError, StoreResult};
use crate::index::FrequencyIndex;
use crate::metrics::StoreMetrics;
use crate::results::{QueryResult, SearchReport};

/// Answers frequency queries against a fully built index.
///
/// Every query becomes one task on a fixed-size pool. Tasks read the index
/// through a shared reference and only write to the concurrent result-count
/// map, so the index itself never needs a lock. Results are delivered in
/// completion order, which need not match query order.
#[derive(Debug)]
pub struct SearchPipeline<'a> {
    index: &'a FrequencyIndex,
    thread_count: NonZeroUsize,
    metrics: StoreMetrics,
}

impl<'a> SearchPipeline<'a> {
    pub fn new(index: &'a FrequencyIndex, thread_count: NonZeroUsize) -> Self {
        Self::with_metrics(index, thread_count, StoreMetrics::new())
    }

    pub fn with_metrics(
        index: &'a FrequencyIndex,
        thread_count: NonZeroUsize,
        metrics: StoreMetrics,
    ) -> Self {
        Self {
            index,
            thread_count,
            metrics,
        }
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    /// Runs one task per query and collects exactly one result per query
    pub fn search(&self, queries: &[Identifier]) -> StoreResult<SearchReport> {
        let start = Instant::now();
        if queries.is_empty() {
            debug!("No queries provided, returning empty report");
            return Ok(SearchReport::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.thread_count.get())
            .thread_name(|i| format!("search-worker-{}", i))
            .build()
            .map_err(|e| StoreError::config_error(format!("search pool: {}", e)))?;

        let counts: DashMap<Identifier, usize> = DashMap::new();
        let (sender, receiver) = mpsc::sync_channel(queries.len());

        let index = self.index;
        let metrics = &self.metrics;
        let shared_counts = &counts;

        // The scope owns the original sender, so the channel closes once every
        // task has finished
        pool.scope(move |scope| {
            for (job, query) in queries.iter().enumerate() {
                let sender = sender.clone();
                let metrics = metrics.clone();
                scope.spawn(move |_| {
                    let result = match index.count(query) {
                        Some(count) => {
                            shared_counts.insert(*query, count);
                            QueryResult::found(*query, count)
                        }
                        None => QueryResult::not_found(*query),
                    };
                    metrics.record_query(result.is_found());
                    debug!(
                        "Worker {:?} finished job {}",
                        rayon::current_thread_index(),
                        job
                    );
                    // One slot per query, so this never blocks
                    let _ = sender.send(result);
                });
            }
        });

        let results: Vec<QueryResult> = receiver.iter().collect();
        debug_assert_eq!(results.len(), queries.len());

        let report = SearchReport {
            results,
            counts: counts.into_iter().collect(),
            build_elapsed: Default::default(),
            search_elapsed: start.elapsed(),
        };
        info!(
            "Search complete. {} of {} queries found in {}",
            report.found(),
            queries.len(),
            humantime::format_duration(report.search_elapsed)
        );
        Ok(report)
    }
}

/// Parses query text, builds the index from the configured store and runs
/// the search. A malformed query fails before the store is read.
pub fn run_search(config: &StoreConfig, queries: &[String]) -> StoreResult<SearchReport> {
    let queries = queries
        .iter()
        .map(|q| Identifier::parse(q))
        .collect::<StoreResult<Vec<_>>>()?;

    let metrics = StoreMetrics::new();
    let build_start = Instant::now();
    let index = FrequencyIndex::build_with_metrics(&config.store_path, &metrics)?;
    let build_elapsed = build_start.elapsed();
    info!(
        "Read {} records from {} in {}",
        index.total_records(),
        config.store_path.display(),
        humantime::format_duration(build_elapsed)
    );

    let pipeline = SearchPipeline::with_metrics(&index, config.thread_count, metrics);
    let mut report = pipeline.search(&queries)?;
    report.build_elapsed = build_elapsed;
    pipeline.metrics().log_stats();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RECORD_SIZE;
    use tempfile::tempdir;

    fn id(n: u8) -> Identifier {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[15] = n;
        Identifier::from_bytes(bytes)
    }

    fn threads(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_found_and_missing() {
        let index = FrequencyIndex::from_records([id(1), id(2), id(1)]);
        let pipeline = SearchPipeline::new(&index, threads(2));

        let report = pipeline.search(&[id(1), id(9)]).unwrap();
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.result_for(&id(1)), Some(&QueryResult::found(id(1), 2)));
        assert_eq!(report.result_for(&id(9)), Some(&QueryResult::not_found(id(9))));
        assert_eq!(report.counts.get(&id(1)), Some(&2));
        assert!(!report.counts.contains_key(&id(9)));

        let stats = pipeline.metrics().get_stats();
        assert_eq!(stats.queries, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_results_are_permutation_of_queries() {
        let records: Vec<Identifier> = (0..40u8)
            .flat_map(|n| vec![id(n); n as usize % 4])
            .collect();
        let index = FrequencyIndex::from_records(records);
        let queries: Vec<Identifier> = (0..60u8).map(|n| id(n % 45)).collect();

        let report = SearchPipeline::new(&index, threads(4))
            .search(&queries)
            .unwrap();

        let mut got: Vec<Identifier> = report.results.iter().map(|r| r.identifier).collect();
        let mut want = queries.clone();
        got.sort();
        want.sort();
        assert_eq!(got, want);

        for result in &report.results {
            assert_eq!(result.count, index.count(&result.identifier));
        }
    }

    #[test]
    fn test_duplicate_queries_each_get_a_result() {
        let index = FrequencyIndex::from_records([id(3)]);
        let report = SearchPipeline::new(&index, threads(1))
            .search(&[id(3), id(3), id(3)])
            .unwrap();
        assert_eq!(report.results.len(), 3);
        assert!(report.results.iter().all(|r| r.count == Some(1)));
        assert_eq!(report.counts.len(), 1);
    }

    #[test]
    fn test_empty_queries() {
        let index = FrequencyIndex::default();
        let report = SearchPipeline::new(&index, threads(2)).search(&[]).unwrap();
        assert!(report.results.is_empty());
        assert!(report.counts.is_empty());
    }

    #[test]
    fn test_run_search_from_store() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("db.bin");
        let mut data = Vec::new();
        for n in [1u8, 2, 2, 1] {
            data.extend_from_slice(id(n).as_bytes());
        }
        std::fs::write(&store, &data).unwrap();

        let config = StoreConfig {
            store_path: store,
            thread_count: threads(2),
            ..Default::default()
        };
        let report = run_search(
            &config,
            &[
                "00000000-0000-0000-0000-000000000001".to_string(),
                "00000000-0000-0000-0000-000000000003".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(report.result_for(&id(1)).unwrap().occurrences(), 2);
        assert_eq!(report.result_for(&id(3)).unwrap().count, None);
    }

    #[test]
    fn test_run_search_rejects_malformed_query() {
        let config = StoreConfig {
            store_path: "does-not-matter.bin".into(),
            ..Default::default()
        };
        let err = run_search(&config, &["nope".to_string()]).unwrap_err();
        assert!(matches!(err, StoreError::MalformedIdentifier(_)));
    }
}
