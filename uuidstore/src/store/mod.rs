//! The binary record store: a flat file of fixed 16-byte records with no
//! header and no framing beyond the record stride.
//!
//! A generation run truncates the file and appends two records per input
//! pair, key first. Once written the file is only ever scanned front to back;
//! the key/value pairing is not recoverable from disk.
pub mod reader;
pub mod writer;

pub use reader::{for_each_record, RecordReader, ScanSummary, MMAP_THRESHOLD};
pub use writer::RecordWriter;

use crate::codec::Identifier;

/// One input unit, expanded into two records on write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairEvent {
    pub key: Identifier,
    pub value: Identifier,
}

impl PairEvent {
    pub fn new(key: Identifier, value: Identifier) -> Self {
        Self { key, value }
    }
}
