use kbrowse_api::{ClusterError, QueryError};

use crate::scanner::PartitionFailure;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("unresolved query: {0}")]
    UnresolvedQuery(#[from] QueryError),

    #[error("cluster unavailable: {0}")]
    ClusterUnavailable(#[from] ClusterError),

    #[error("all {} partition scans failed", .failures.len())]
    AllPartitionsFailed { failures: Vec<PartitionFailure> },

    #[error("config error: {0}")]
    Config(String),

    #[error("scan pool is shut down")]
    ShutDown,
}

impl SearchError {
    /// Whether the caller may repeat the same search and expect a
    /// different outcome. The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::ClusterUnavailable(e) => e.is_retryable(),
            SearchError::AllPartitionsFailed { failures } => {
                failures.iter().all(|f| f.error.is_retryable())
            }
            SearchError::UnresolvedQuery(_) | SearchError::Config(_) | SearchError::ShutDown => false,
        }
    }
}
