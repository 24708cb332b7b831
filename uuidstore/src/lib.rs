pub mod codec;
pub mod config;
pub mod errors;
pub mod index;
pub mod metrics;
pub mod pipeline;
pub mod results;
pub mod store;

pub use codec::{decode, encode, Identifier, RECORD_SIZE};
pub use config::{CliOverrides, StoreConfig};
pub use errors::{StoreError, StoreResult};
pub use index::FrequencyIndex;
pub use pipeline::{generate_from_path, run_search, GenerationPipeline, SearchPipeline};
pub use results::{GenerationSummary, QueryResult, SearchReport};
