//! The two pipelines built on top of the store.
//!
//! Generation runs one producer (the caller) and one writer thread joined by a
//! bounded queue, so file writes are strictly serialized and back-pressure
//! is the only flow control. Search fans out one task per query over a
//! fixed-size pool and gathers results from a channel in completion order.
pub mod generate;
pub mod search;

pub use generate::{generate_from_path, parse_line, GenerationPipeline, GenerationState};
pub use search::{run_search, SearchPipeline};
