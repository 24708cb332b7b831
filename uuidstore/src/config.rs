use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{StoreError, StoreResult};

/// Configuration shared by the generation and search pipelines.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.uuidstore.yaml` in the current directory
/// 3. Global `$HOME/.config/uuidstore/config.yaml`
///
/// # Configuration Format
///
/// ```yaml
/// # Newline-delimited JSON pairs consumed by generation
/// input_path: "events.json"
///
/// # Binary record store
/// store_path: "db.bin"
///
/// # Capacity of the queue between the reader and the writer worker
/// queue_capacity: 10
///
/// # Search pool size (default: CPU cores)
/// thread_count: 4
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
///
/// Command-line arguments take precedence over file values, see
/// [`StoreConfig::merge_with_cli`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Input file of newline-delimited JSON pairs
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,

    /// Binary store file
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Bound of the generation queue; the reader blocks when it is full
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: NonZeroUsize,

    /// Number of search workers
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

pub fn default_input_path() -> PathBuf {
    PathBuf::from("events.json")
}

pub fn default_store_path() -> PathBuf {
    PathBuf::from("db.bin")
}

pub fn default_queue_capacity() -> NonZeroUsize {
    NonZeroUsize::new(10).unwrap()
}

pub fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            store_path: default_store_path(),
            queue_capacity: default_queue_capacity(),
            thread_count: default_thread_count(),
            log_level: default_log_level(),
        }
    }
}

/// Values given on the command line; `None` leaves the file value in place
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub input_path: Option<PathBuf>,
    pub store_path: Option<PathBuf>,
    pub queue_capacity: Option<NonZeroUsize>,
    pub thread_count: Option<NonZeroUsize>,
    pub log_level: Option<String>,
}

impl StoreConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration, layering `config_path` over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("uuidstore/config.yaml")),
            Some(PathBuf::from(".uuidstore.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Renders the configuration in the same YAML layout `load_from` reads
    pub fn to_yaml(&self) -> StoreResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| StoreError::config_error(format!("Failed to serialize config: {}", e)))
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(input_path) = cli.input_path {
            self.input_path = input_path;
        }
        if let Some(store_path) = cli.store_path {
            self.store_path = store_path;
        }
        if let Some(queue_capacity) = cli.queue_capacity {
            self.queue_capacity = queue_capacity;
        }
        if let Some(thread_count) = cli.thread_count {
            self.thread_count = thread_count;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }
}
