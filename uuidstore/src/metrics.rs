use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::store::reader::MMAP_THRESHOLD;

/// Tracks throughput counters shared between pipeline workers
#[derive(Debug, Clone)]
pub struct StoreMetrics {
    // Generation metrics
    pairs_read: Arc<AtomicU64>,
    records_written: Arc<AtomicU64>,
    bytes_written: Arc<AtomicU64>,

    // Scan metrics
    records_scanned: Arc<AtomicU64>,
    buffered_scans: Arc<AtomicU64>,
    mmap_scans: Arc<AtomicU64>,

    // Query metrics
    queries: Arc<AtomicU64>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl StoreMetrics {
    /// Creates a new StoreMetrics instance
    pub fn new() -> Self {
        Self {
            pairs_read: Arc::new(AtomicU64::new(0)),
            records_written: Arc::new(AtomicU64::new(0)),
            bytes_written: Arc::new(AtomicU64::new(0)),
            records_scanned: Arc::new(AtomicU64::new(0)),
            buffered_scans: Arc::new(AtomicU64::new(0)),
            mmap_scans: Arc::new(AtomicU64::new(0)),
            queries: Arc::new(AtomicU64::new(0)),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records one decoded input pair
    pub fn record_pair_read(&self) {
        self.pairs_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Records records flushed to the store
    pub fn record_write(&self, records: u64, bytes: u64) {
        self.records_written.fetch_add(records, Ordering::Relaxed);
        let total = self.bytes_written.fetch_add(bytes, Ordering::Relaxed) + bytes;
        debug!("Wrote {} bytes, total: {} bytes", bytes, total);
    }

    /// Records a completed scan of a store of `len` bytes
    pub fn record_scan(&self, len: u64, records: u64) {
        if len >= MMAP_THRESHOLD {
            self.mmap_scans.fetch_add(1, Ordering::Relaxed);
        } else {
            self.buffered_scans.fetch_add(1, Ordering::Relaxed);
        }
        self.records_scanned.fetch_add(records, Ordering::Relaxed);
    }

    /// Records a single query lookup
    pub fn record_query(&self, hit: bool) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Gets the current counter values
    pub fn get_stats(&self) -> StoreStats {
        StoreStats {
            pairs_read: self.pairs_read.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            records_scanned: self.records_scanned.load(Ordering::Relaxed),
            buffered_scans: self.buffered_scans.load(Ordering::Relaxed),
            mmap_scans: self.mmap_scans.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Store stats:\n\
             Pairs read: {}\n\
             Records written: {} ({} bytes)\n\
             Records scanned: {}\n\
             Scans (buffered/mmap): {}/{}\n\
             Queries (hits/misses): {} ({}/{})",
            stats.pairs_read,
            stats.records_written,
            stats.bytes_written,
            stats.records_scanned,
            stats.buffered_scans,
            stats.mmap_scans,
            stats.queries,
            stats.hits,
            stats.misses
        );
    }
}

impl Default for StoreMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the store counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub pairs_read: u64,
    pub records_written: u64,
    pub bytes_written: u64,
    pub records_scanned: u64,
    pub buffered_scans: u64,
    pub mmap_scans: u64,
    pub queries: u64,
    pub hits: u64,
    pub misses: u64,
}
