use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::PairEvent;
use crate::codec::RECORD_SIZE;
use crate::errors::{StoreError, StoreResult};

const BUFFER_CAPACITY: usize = 65536;

/// Exclusive appender for a store file
#[derive(Debug)]
pub struct RecordWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    records_written: u64,
}

impl RecordWriter {
    /// Creates the store file, truncating any previous contents
    pub fn open(path: &Path) -> StoreResult<Self> {
        let file = File::create(path).map_err(|e| StoreError::from_open(path, e))?;
        debug!("Opened store for writing: {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::with_capacity(BUFFER_CAPACITY, file),
            records_written: 0,
        })
    }

    /// Appends the key record followed by the value record.
    ///
    /// A failure on the second write leaves a dangling odd record behind; the
    /// store is unusable after any error.
    pub fn append(&mut self, pair: &PairEvent) -> StoreResult<()> {
        self.writer.write_all(pair.key.as_bytes())?;
        self.records_written += 1;
        self.writer.write_all(pair.value.as_bytes())?;
        self.records_written += 1;
        trace!("Appended pair {} -> {}", pair.key, pair.value);
        Ok(())
    }

    /// Number of records handed to the writer so far
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flushes buffered records and releases the file
    pub fn close(self) -> StoreResult<u64> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        debug!(
            "Closed store {} after {} records ({} bytes)",
            self.path.display(),
            self.records_written,
            self.records_written * RECORD_SIZE as u64
        );
        Ok(self.records_written)
    }
}
