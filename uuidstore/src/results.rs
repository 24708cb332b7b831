/// Value types produced by the two pipelines.
///
/// A [`QueryResult`] is produced once per query by a search worker and moved
/// through the result channel to the collector, which owns the
/// [`SearchReport`]. Nothing here is shared between threads by reference; each
/// value has exactly one owner at a time.
///
/// ```rust,ignore
/// let report = run_search(&config, &queries)?;
/// for result in &report.results {
///     println!("{}", result); // "UUID: ... found 2 times"
/// }
/// ```
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::codec::Identifier;

/// Outcome of looking up one query identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    /// The identifier that was queried
    pub identifier: Identifier,
    /// Occurrences in the store, `None` when absent
    pub count: Option<usize>,
}

impl QueryResult {
    pub fn found(identifier: Identifier, count: usize) -> Self {
        Self {
            identifier,
            count: Some(count),
        }
    }

    pub fn not_found(identifier: Identifier) -> Self {
        Self {
            identifier,
            count: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.count.is_some()
    }

    /// Occurrence count with absence treated as zero
    pub fn occurrences(&self) -> usize {
        self.count.unwrap_or(0)
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.count {
            Some(count) => write!(f, "UUID: {} found {} times", self.identifier, count),
            None => write!(f, "UUID: {} not found", self.identifier),
        }
    }
}

/// Everything the collector gathered during one search run
#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    /// One result per query, in the order the collector received them
    pub results: Vec<QueryResult>,
    /// Counts of the identifiers that were found
    pub counts: HashMap<Identifier, usize>,
    /// Time spent building the frequency index
    pub build_elapsed: Duration,
    /// Time spent running the search workers
    pub search_elapsed: Duration,
}

impl SearchReport {
    /// Creates a new empty report
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of queries that matched at least one record
    pub fn found(&self) -> usize {
        self.results.iter().filter(|r| r.is_found()).count()
    }

    /// Looks up the collected result for `id`
    pub fn result_for(&self, id: &Identifier) -> Option<&QueryResult> {
        self.results.iter().find(|r| &r.identifier == id)
    }
}

/// Totals of one generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    pub pairs_read: u64,
    pub records_written: u64,
    pub bytes_written: u64,
    pub elapsed: Duration,
}
