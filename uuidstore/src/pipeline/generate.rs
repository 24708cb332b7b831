use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::codec::{Identifier, RECORD_SIZE};
use crate::config::StoreConfig;
use crate::errors::{StoreError, StoreResult};
use crate::metrics::StoreMetrics;
use crate::results::GenerationSummary;
use crate::store::{PairEvent, RecordWriter};

const BUFFER_CAPACITY: usize = 65536;

/// Lifecycle of a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Streaming,
    Draining,
    Done,
    Failed,
}

/// Input line as it appears in the events file
#[derive(Debug, Deserialize)]
struct RawEvent {
    key: String,
    value: String,
}

/// Decodes one input line into a pair. `line_number` is 1-based.
pub fn parse_line(line: &str, line_number: usize) -> StoreResult<PairEvent> {
    let raw: RawEvent = serde_json::from_str(line)
        .map_err(|e| StoreError::malformed_input_line(line_number, e))?;
    Ok(PairEvent::new(
        Identifier::parse(&raw.key)?,
        Identifier::parse(&raw.value)?,
    ))
}

/// Why the producer stopped feeding the queue
enum StreamEnd {
    Exhausted(u64),
    WriterGone,
}

/// Streams input pairs through a bounded queue to a single writer thread.
///
/// The reader blocks whenever the queue is full. Any decode or write failure
/// ends the run; the store file is then left partially written.
#[derive(Debug)]
pub struct GenerationPipeline {
    queue_capacity: NonZeroUsize,
    metrics: StoreMetrics,
    state: GenerationState,
}

impl GenerationPipeline {
    pub fn new(queue_capacity: NonZeroUsize) -> Self {
        Self::with_metrics(queue_capacity, StoreMetrics::new())
    }

    pub fn with_metrics(queue_capacity: NonZeroUsize, metrics: StoreMetrics) -> Self {
        Self {
            queue_capacity,
            metrics,
            state: GenerationState::Idle,
        }
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    fn transition(&mut self, next: GenerationState) {
        debug!("Generation state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Writes every pair read from `input` to a fresh store at `store_path`
    pub fn run<R: BufRead>(
        &mut self,
        input: R,
        store_path: &Path,
    ) -> StoreResult<GenerationSummary> {
        let result = self.run_inner(input, store_path);
        match &result {
            Ok(_) => self.transition(GenerationState::Done),
            Err(e) => {
                warn!("Generation aborted: {}", e);
                self.transition(GenerationState::Failed);
            }
        }
        result
    }

    fn run_inner<R: BufRead>(
        &mut self,
        input: R,
        store_path: &Path,
    ) -> StoreResult<GenerationSummary> {
        let start = Instant::now();
        let writer = RecordWriter::open(store_path)?;
        self.transition(GenerationState::Streaming);

        let (sender, receiver) = mpsc::sync_channel(self.queue_capacity.get());
        let worker_metrics = self.metrics.clone();
        let handle = thread::Builder::new()
            .name("store-writer".to_string())
            .spawn(move || write_worker(writer, receiver, worker_metrics))?;

        let streamed = stream_pairs(input, &sender, &self.metrics);

        // Closing the queue lets the worker finish its backlog and exit
        drop(sender);
        self.transition(GenerationState::Draining);
        let written = handle
            .join()
            .map_err(|_| StoreError::WorkerPanicked("store writer"))?;

        let (pairs_read, records_written) = match (streamed, written) {
            (Err(e), _) => return Err(e),
            (Ok(_), Err(e)) => return Err(e),
            (Ok(StreamEnd::WriterGone), Ok(_)) => {
                return Err(StoreError::WorkerPanicked("store writer"))
            }
            (Ok(StreamEnd::Exhausted(pairs)), Ok(records)) => (pairs, records),
        };

        let summary = GenerationSummary {
            pairs_read,
            records_written,
            bytes_written: records_written * RECORD_SIZE as u64,
            elapsed: start.elapsed(),
        };
        info!(
            "Wrote {} records for {} pairs to {} in {}",
            summary.records_written,
            summary.pairs_read,
            store_path.display(),
            humantime::format_duration(summary.elapsed)
        );
        self.metrics.log_stats();
        Ok(summary)
    }
}

/// Producer half: decode lines and push pairs until input ends or fails
fn stream_pairs<R: BufRead>(
    input: R,
    jobs: &SyncSender<PairEvent>,
    metrics: &StoreMetrics,
) -> StoreResult<StreamEnd> {
    let mut pairs = 0u64;
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let pair = parse_line(&line, index + 1)?;
        metrics.record_pair_read();
        trace!("Queueing pair from line {}", index + 1);
        if jobs.send(pair).is_err() {
            debug!("Writer worker stopped before input was exhausted");
            return Ok(StreamEnd::WriterGone);
        }
        pairs += 1;
    }
    Ok(StreamEnd::Exhausted(pairs))
}

/// Consumer half: the only code that touches the store file
fn write_worker(
    mut writer: RecordWriter,
    jobs: Receiver<PairEvent>,
    metrics: StoreMetrics,
) -> StoreResult<u64> {
    for pair in jobs {
        writer.append(&pair)?;
        metrics.record_write(2, 2 * RECORD_SIZE as u64);
    }
    debug!("Writer worker got closed queue");
    writer.close()
}

/// Generates the configured store from the configured input file
pub fn generate_from_path(config: &StoreConfig) -> StoreResult<GenerationSummary> {
    info!(
        "Generating {} from {}",
        config.store_path.display(),
        config.input_path.display()
    );
    // Open the input first so a missing input never truncates an existing store
    let input = File::open(&config.input_path)
        .map_err(|e| StoreError::from_open(&config.input_path, e))?;
    let reader = BufReader::with_capacity(BUFFER_CAPACITY, input);

    GenerationPipeline::new(config.queue_capacity).run(reader, &config.store_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    const KEY: &str = "00000000-0000-0000-0000-000000000001";
    const VALUE: &str = "00000000-0000-0000-0000-000000000002";

    fn pair_line(key: &str, value: &str) -> String {
        format!("{{\"key\":\"{}\",\"value\":\"{}\"}}\n", key, value)
    }

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_parse_line() {
        let pair = parse_line(pair_line(KEY, VALUE).trim(), 1).unwrap();
        assert_eq!(pair.key.to_string(), KEY);
        assert_eq!(pair.value.to_string(), VALUE);
    }

    #[test]
    fn test_parse_line_errors() {
        let err = parse_line("{\"key\":", 4).unwrap_err();
        assert!(matches!(err, StoreError::MalformedInputLine { line: 4, .. }));

        let err = parse_line(&format!("{{\"key\":\"{}\"}}", KEY), 2).unwrap_err();
        assert!(matches!(err, StoreError::MalformedInputLine { line: 2, .. }));

        let err = parse_line(pair_line(KEY, "bogus").trim(), 1).unwrap_err();
        assert!(matches!(err, StoreError::MalformedIdentifier(ref t) if t == "bogus"));
    }

    #[test]
    fn test_run_writes_pairs_in_order() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("db.bin");

        let ids: Vec<String> = (1..=50)
            .map(|n| format!("00000000-0000-0000-0000-{:012x}", n))
            .collect();
        let input: String = ids
            .chunks(2)
            .map(|pair| pair_line(&pair[0], &pair[1]))
            .collect();

        let mut pipeline = GenerationPipeline::new(capacity(3));
        assert_eq!(pipeline.state(), GenerationState::Idle);
        let summary = pipeline.run(Cursor::new(input), &store).unwrap();
        assert_eq!(pipeline.state(), GenerationState::Done);

        assert_eq!(summary.pairs_read, 25);
        assert_eq!(summary.records_written, 50);
        assert_eq!(summary.bytes_written, 50 * RECORD_SIZE as u64);

        let bytes = std::fs::read(&store).unwrap();
        assert_eq!(bytes.len(), 32 * 25);
        let decoded: Vec<String> = bytes
            .chunks_exact(RECORD_SIZE)
            .map(|r| crate::codec::decode(r.try_into().unwrap()))
            .collect();
        assert_eq!(decoded, ids);

        let stats = pipeline.metrics().get_stats();
        assert_eq!(stats.pairs_read, 25);
        assert_eq!(stats.records_written, 50);
    }

    #[test]
    fn test_blank_line_aborts() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("db.bin");
        let input = format!("{}\n{}", pair_line(KEY, VALUE), pair_line(VALUE, KEY));

        let mut pipeline = GenerationPipeline::new(capacity(1));
        let err = pipeline.run(Cursor::new(input), &store).unwrap_err();
        assert!(matches!(err, StoreError::MalformedInputLine { line: 2, .. }));
        assert_eq!(pipeline.state(), GenerationState::Failed);
    }

    #[test]
    fn test_trailing_newline_is_not_a_line() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("db.bin");
        let input = format!("{}{}", pair_line(KEY, VALUE), pair_line(VALUE, KEY));

        let summary = GenerationPipeline::new(capacity(1))
            .run(Cursor::new(input), &store)
            .unwrap();
        assert_eq!(summary.pairs_read, 2);
        assert_eq!(std::fs::metadata(&store).unwrap().len(), 64);
    }

    #[test]
    fn test_run_empty_input() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("db.bin");

        let summary = GenerationPipeline::new(capacity(10))
            .run(Cursor::new(""), &store)
            .unwrap();
        assert_eq!(summary.records_written, 0);
        assert_eq!(std::fs::metadata(&store).unwrap().len(), 0);
    }

    #[test]
    fn test_malformed_line_aborts() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("db.bin");
        let input = format!("{}not json\n{}", pair_line(KEY, VALUE), pair_line(KEY, VALUE));

        let mut pipeline = GenerationPipeline::new(capacity(10));
        let err = pipeline.run(Cursor::new(input), &store).unwrap_err();
        assert!(matches!(err, StoreError::MalformedInputLine { line: 2, .. }));
        assert_eq!(pipeline.state(), GenerationState::Failed);
        // Only pairs before the bad line can have reached the store
        assert!(std::fs::metadata(&store).unwrap().len() <= 32);
    }

    #[test]
    fn test_unwritable_store_fails() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("missing").join("db.bin");

        let mut pipeline = GenerationPipeline::new(capacity(10));
        let err = pipeline
            .run(Cursor::new(pair_line(KEY, VALUE)), &store)
            .unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound(_)));
        assert_eq!(pipeline.state(), GenerationState::Failed);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_failure_stops_generation() {
        // More than the writer's buffer, so appends hit the device
        let input: String = (0..5000).map(|_| pair_line(KEY, VALUE)).collect();

        let mut pipeline = GenerationPipeline::new(capacity(10));
        let err = pipeline
            .run(Cursor::new(input), Path::new("/dev/full"))
            .unwrap_err();
        assert!(matches!(err, StoreError::StoreIo(_)), "got {:?}", err);
        assert_eq!(pipeline.state(), GenerationState::Failed);
    }

    #[test]
    fn test_generate_from_path_missing_input_keeps_store() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("db.bin");
        std::fs::write(&store, [7u8; 32]).unwrap();

        let config = StoreConfig {
            input_path: dir.path().join("events.json"),
            store_path: store.clone(),
            ..Default::default()
        };
        let err = generate_from_path(&config).unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound(_)));
        assert_eq!(std::fs::read(&store).unwrap(), vec![7u8; 32]);
    }
}
