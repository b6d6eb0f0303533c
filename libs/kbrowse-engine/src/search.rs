use std::sync::Arc;
use std::time::Instant;

use kbrowse_api::{ClusterOffsetLookup, MessageQuery, RecordFetcher, TopicOffsets};

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::planner::RangePlanner;
use crate::pool::ScanPool;
use crate::resolver::OffsetResolver;
use crate::scanner::{PredicateScanner, SearchOutcome};

/// Entry point of the query core: time window in, matching records out.
///
/// time window → resolved offsets → planned windows → scanned records.
pub struct MessageSearch {
    planner: RangePlanner,
    scanner: PredicateScanner,
}

impl MessageSearch {
    pub fn new(
        lookup: Arc<dyn ClusterOffsetLookup>,
        fetcher: Arc<dyn RecordFetcher>,
        pool: Arc<ScanPool>,
        config: &SearchConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let planner = RangePlanner::new(OffsetResolver::new(lookup));
        let scanner =
            PredicateScanner::new(fetcher, pool, config.fetch_timeout(), config.batch_size);
        Ok(Self { planner, scanner })
    }

    /// Find records of `topic` written in `[from_ms, to_ms)` that match
    /// `query`.
    ///
    /// Offset lookup failures are returned as errors, never as an empty
    /// result. When no partition has data in range the scanner is not
    /// called and the outcome is empty. After [`close`](Self::close) every
    /// search returns [`SearchError::ShutDown`].
    pub async fn search(
        &self,
        topic: &str,
        query: &MessageQuery,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<SearchOutcome, SearchError> {
        if self.scanner.pool().is_shut_down() {
            return Err(SearchError::ShutDown);
        }
        let started = Instant::now();
        let predicate = Arc::new(query.predicate());

        let windows = self.planner.plan(topic, from_ms, to_ms).await?;
        if windows.is_empty() {
            tracing::info!(topic, from_ms, to_ms, "no partition has data in range");
            return Ok(SearchOutcome::default());
        }
        let planned = windows.len();

        let outcome = self.scanner.scan(windows, predicate).await?;
        tracing::info!(
            topic,
            kind = %query.kind(),
            windows = planned,
            matches = outcome.records.len(),
            failed = outcome.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );
        Ok(outcome)
    }

    /// High-water mark summary of a topic.
    pub async fn topic_offsets(&self, topic: &str) -> Result<TopicOffsets, SearchError> {
        Ok(self.planner.resolver().topic_offsets(topic).await?)
    }

    /// Close the scan pool. In-flight searches end with
    /// [`SearchError::ShutDown`].
    pub fn close(&self) {
        self.scanner.pool().shutdown();
    }
}
