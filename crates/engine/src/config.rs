//! Sink configuration via `docsink.toml`
//!
//! On first use in a directory a default, commented `docsink.toml` is
//! created. To change settings, edit the file and construct a new sink;
//! transactions read their options once, when they start.

use docsink_concurrency::{available_parallelism, TxOptions, DEFAULT_MAX_QUEUE_DEPTH};
use docsink_core::{SinkError, SinkResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name placed in the configuration directory.
pub const CONFIG_FILE_NAME: &str = "docsink.toml";

/// Default transaction lifetime in milliseconds (50 s).
pub const DEFAULT_LIFETIME_MS: u64 = 50_000;

/// Default database for collections named without one.
pub const DEFAULT_DATABASE: &str = "defaultdb";

/// Sink configuration loaded from `docsink.toml`.
///
/// # Example
///
/// ```toml
/// lifetime_ms = 50000
/// conversion_workers = 0
/// max_queue_depth = 4096
/// flush_threshold = 1
/// default_database = "defaultdb"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Session lifetime before a transaction rotates, in milliseconds.
    #[serde(default = "default_lifetime_ms")]
    pub lifetime_ms: u64,
    /// Conversion worker threads; 0 means available parallelism.
    #[serde(default)]
    pub conversion_workers: usize,
    /// Queued conversion tasks before the caller runs tasks itself.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
    /// Queued write functions that trigger execution.
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
    /// Database used by [`crate::DocSink::collection`].
    #[serde(default = "default_database")]
    pub default_database: String,
}

fn default_lifetime_ms() -> u64 {
    DEFAULT_LIFETIME_MS
}

fn default_max_queue_depth() -> usize {
    DEFAULT_MAX_QUEUE_DEPTH
}

fn default_flush_threshold() -> usize {
    1
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            lifetime_ms: default_lifetime_ms(),
            conversion_workers: 0,
            max_queue_depth: default_max_queue_depth(),
            flush_threshold: default_flush_threshold(),
            default_database: default_database(),
        }
    }
}

impl SinkConfig {
    /// Reject values no sink can run with.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first invalid field.
    pub fn validate(&self) -> SinkResult<()> {
        if self.lifetime_ms == 0 {
            return Err(SinkError::invalid_config(
                "lifetime_ms must be greater than 0",
            ));
        }
        if self.max_queue_depth == 0 {
            return Err(SinkError::invalid_config(
                "max_queue_depth must be greater than 0",
            ));
        }
        if self.flush_threshold == 0 {
            return Err(SinkError::invalid_config(
                "flush_threshold must be at least 1",
            ));
        }
        if self.default_database.is_empty() {
            return Err(SinkError::invalid_config(
                "default_database must not be empty",
            ));
        }
        Ok(())
    }

    /// Session lifetime as a duration.
    pub fn lifetime(&self) -> Duration {
        Duration::from_millis(self.lifetime_ms)
    }

    /// Worker count with 0 resolved to available parallelism.
    pub fn worker_count(&self) -> usize {
        if self.conversion_workers == 0 {
            available_parallelism()
        } else {
            self.conversion_workers
        }
    }

    /// Transaction options derived from this config.
    pub fn tx_options(&self) -> TxOptions {
        TxOptions::default()
            .with_lifetime(self.lifetime())
            .with_flush_threshold(self.flush_threshold)
    }

    /// Set the lifetime.
    ///
    /// Stored in whole milliseconds, rounded up, so any non-zero lifetime
    /// stays non-zero.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        let millis = (lifetime.as_nanos() + 999_999) / 1_000_000;
        self.lifetime_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    /// Set the number of conversion workers.
    pub fn with_conversion_workers(mut self, workers: usize) -> Self {
        self.conversion_workers = workers;
        self
    }

    /// Set the flush threshold.
    pub fn with_flush_threshold(mut self, flush_threshold: usize) -> Self {
        self.flush_threshold = flush_threshold;
        self
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docsink configuration
#
# Session lifetime in milliseconds (default: 50000).
# A transaction whose session is older than this commits it and opens a new
# one before running its next write function. Keep it below the server's
# transaction time limit.
lifetime_ms = 50000

# Conversion worker threads (default: 0 = available parallelism).
conversion_workers = 0

# Queued conversion tasks before the submitting thread runs tasks itself.
max_queue_depth = 4096

# Queued write functions that trigger execution (default: 1 = every send
# runs immediately).
flush_threshold = 1

# Database for collections named without one.
default_database = "defaultdb"
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read, parsed or
    /// validated.
    pub fn from_file(path: &Path) -> SinkResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SinkError::invalid_config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: SinkConfig = toml::from_str(&content).map_err(|e| {
            SinkError::invalid_config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `docsink.toml` from `dir`, writing the default file first if it
    /// does not exist.
    pub fn load_or_create(dir: &Path) -> SinkResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        Self::write_default_if_missing(&path)?;
        Self::from_file(&path)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> SinkResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                SinkError::invalid_config(format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> SinkResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            SinkError::invalid_config(format!("failed to serialize config: {}", e))
        })?;
        std::fs::write(path, content).map_err(|e| {
            SinkError::invalid_config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
