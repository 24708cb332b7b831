use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::codec::{Identifier, RECORD_SIZE};
use crate::errors::{StoreError, StoreResult};

const BUFFER_CAPACITY: usize = 65536;
/// Stores at or above this size are memory mapped instead of buffered
pub const MMAP_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

/// Sequential reader yielding one identifier per 16-byte record
#[derive(Debug)]
pub struct RecordReader<R> {
    inner: R,
    path: PathBuf,
    offset: u64,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
            offset: 0,
        }
    }

    /// Reads the next full record. Returns `None` at a clean end of file and
    /// `CorruptStore` when the file ends inside a record.
    pub fn read_record(&mut self) -> StoreResult<Option<Identifier>> {
        let mut buf = [0u8; RECORD_SIZE];
        let mut filled = 0;
        while filled < RECORD_SIZE {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(StoreError::StoreIo(e)),
            }
        }

        match filled {
            0 => Ok(None),
            RECORD_SIZE => {
                self.offset += RECORD_SIZE as u64;
                Ok(Some(Identifier::from_bytes(buf)))
            }
            partial => Err(StoreError::corrupt_store(
                &self.path,
                self.offset + partial as u64,
            )),
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = StoreResult<Identifier>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// What a full scan saw: records visited and the file length they came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub records: u64,
    pub len: u64,
}

/// Visits every record of the store at `path` in file order.
///
/// The file length is checked up front so a truncated store is rejected
/// before any record reaches `visit`.
pub fn for_each_record(
    path: &Path,
    mut visit: impl FnMut(Identifier),
) -> StoreResult<ScanSummary> {
    let file = File::open(path).map_err(|e| StoreError::from_open(path, e))?;
    let len = file.metadata()?.len();
    if len % RECORD_SIZE as u64 != 0 {
        return Err(StoreError::corrupt_store(path, len));
    }

    let mut records = 0u64;
    if len >= MMAP_THRESHOLD {
        debug!("Memory mapping store {} ({} bytes)", path.display(), len);
        let mmap = unsafe { Mmap::map(&file) }?;
        for chunk in mmap.chunks_exact(RECORD_SIZE) {
            let mut bytes = [0u8; RECORD_SIZE];
            bytes.copy_from_slice(chunk);
            visit(Identifier::from_bytes(bytes));
            records += 1;
        }
    } else {
        debug!("Buffered scan of store {} ({} bytes)", path.display(), len);
        let reader = RecordReader::new(BufReader::with_capacity(BUFFER_CAPACITY, file), path);
        for record in reader {
            visit(record?);
            records += 1;
        }
    }

    trace!("Scanned {} records from {}", records, path.display());
    Ok(ScanSummary { records, len })
}
