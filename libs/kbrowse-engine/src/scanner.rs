use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use kbrowse_api::{
    ClusterError, MatchPredicate, OffsetRange, PartitionRef, Record, RecordFetcher, SearchWindow,
};

use crate::error::SearchError;
use crate::pool::ScanPool;

/// A partition whose scan could not complete.
#[derive(Debug, Clone)]
pub struct PartitionFailure {
    pub partition: PartitionRef,
    pub error: ClusterError,
}

impl Serialize for PartitionFailure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("PartitionFailure", 4)?;
        s.serialize_field("topic", &self.partition.topic)?;
        s.serialize_field("partition", &self.partition.partition)?;
        s.serialize_field("kind", &self.error.kind.to_string())?;
        s.serialize_field("error", &self.error.message)?;
        s.end()
    }
}

/// Aggregate result of a search.
///
/// `records` keeps per-partition offset order, partitions in window order.
/// `completed` and `failures` together list every scanned partition.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub records: Vec<Record>,
    pub completed: Vec<PartitionRef>,
    pub failures: Vec<PartitionFailure>,
}

impl SearchOutcome {
    /// Some partitions failed, so `records` may be incomplete.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Fetches each window through the shared [`ScanPool`] and keeps the
/// records the predicate accepts.
#[derive(Clone)]
pub struct PredicateScanner {
    fetcher: Arc<dyn RecordFetcher>,
    pool: Arc<ScanPool>,
    fetch_timeout: Duration,
    batch_size: u64,
}

impl PredicateScanner {
    pub fn new(
        fetcher: Arc<dyn RecordFetcher>,
        pool: Arc<ScanPool>,
        fetch_timeout: Duration,
        batch_size: u64,
    ) -> Self {
        Self {
            fetcher,
            pool,
            fetch_timeout,
            batch_size: batch_size.max(1),
        }
    }

    pub fn pool(&self) -> &Arc<ScanPool> {
        &self.pool
    }

    /// Scan every window concurrently and collect matches.
    ///
    /// A failing partition is recorded in [`SearchOutcome::failures`] and
    /// does not stop the others. Fails with
    /// [`SearchError::AllPartitionsFailed`] only when no window succeeds.
    pub async fn scan(
        &self,
        windows: Vec<SearchWindow>,
        predicate: Arc<MatchPredicate>,
    ) -> Result<SearchOutcome, SearchError> {
        let windows: Vec<SearchWindow> = windows.into_iter().filter(|w| !w.is_empty()).collect();
        let mut outcome = SearchOutcome::default();
        if windows.is_empty() {
            return Ok(outcome);
        }

        let mut handles = Vec::with_capacity(windows.len());
        for window in windows {
            let partition = window.partition().clone();
            let fetcher = self.fetcher.clone();
            let predicate = predicate.clone();
            let timeout = self.fetch_timeout;
            let batch_size = self.batch_size;
            let handle = self.pool.spawn(async move {
                scan_window(fetcher.as_ref(), &window, &predicate, timeout, batch_size).await
            })?;
            handles.push((partition, handle));
        }

        for (partition, handle) in handles {
            match handle.await {
                Ok(Some(Ok(records))) => {
                    outcome.records.extend(records);
                    outcome.completed.push(partition);
                }
                Ok(Some(Err(error))) => {
                    tracing::warn!(%partition, error = %error, "partition scan failed");
                    outcome.failures.push(PartitionFailure { partition, error });
                }
                Ok(None) => return Err(SearchError::ShutDown),
                Err(e) => {
                    tracing::error!(%partition, error = %e, "partition scan task aborted");
                    let error = ClusterError::logic(format!("scan task aborted: {e}"));
                    outcome.failures.push(PartitionFailure { partition, error });
                }
            }
        }

        if outcome.completed.is_empty() {
            return Err(SearchError::AllPartitionsFailed { failures: outcome.failures });
        }
        Ok(outcome)
    }
}

/// Walk one window in batches of at most `batch_size` offsets, in offset order.
async fn scan_window(
    fetcher: &dyn RecordFetcher,
    window: &SearchWindow,
    predicate: &MatchPredicate,
    timeout: Duration,
    batch_size: u64,
) -> Result<Vec<Record>, ClusterError> {
    let partition = window.partition();
    let bounds = window.range();
    let mut matches = Vec::new();
    let mut next = bounds.start;

    while next < bounds.end {
        let batch_end = next.saturating_add(batch_size).min(bounds.end);
        let ranges = BTreeMap::from([(partition.clone(), OffsetRange::new(next, batch_end))]);
        let records = tokio::time::timeout(timeout, fetcher.fetch(&ranges))
            .await
            .map_err(|_| {
                ClusterError::timeout(format!(
                    "fetch {partition} [{next}, {batch_end}) exceeded {}ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| e.with_context(format!("fetch {partition}")))?;

        let requested = OffsetRange::new(next, batch_end);
        let mut last_read = None;
        for record in records {
            if record.partition != *partition || !requested.contains(record.offset) {
                continue;
            }
            last_read = last_read.max(Some(record.offset));
            if predicate.matches_record(&record) {
                matches.push(record);
            }
        }
        // A short batch resumes after the last record returned; an empty one
        // means nothing is readable in the requested range.
        next = match last_read {
            Some(offset) => offset + 1,
            None => batch_end,
        };
    }

    Ok(matches)
}
