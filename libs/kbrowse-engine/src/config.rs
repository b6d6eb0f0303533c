use std::time::Duration;

use serde::Deserialize;

use crate::error::SearchError;

/// Search engine settings, embedded in the server's TOML config as `[search]`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Scan pool concurrency ceiling.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Deadline applied to every fetch call.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Offsets requested per fetch call.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

fn default_workers() -> usize {
    16
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_batch_size() -> u64 {
    500
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            batch_size: default_batch_size(),
        }
    }
}

impl SearchConfig {
    /// Reject settings that would make the pool useless or a fetch unbounded.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.workers == 0 {
            return Err(SearchError::Config("search.workers must be greater than 0".into()));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(SearchError::Config(
                "search.fetch_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(SearchError::Config("search.batch_size must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}
