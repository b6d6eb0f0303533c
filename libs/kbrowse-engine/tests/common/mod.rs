#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cluster_memory::MemoryCluster;
use kbrowse_api::{
    ClusterError, ClusterOffsetLookup, OffsetPoint, OffsetRange, PartitionRef, Record,
    RecordFetcher, TopicOffsets,
};
use kbrowse_engine::{MessageSearch, ScanPool, SearchConfig};

/// `orders` with 2 partitions: partition 0 holds offsets 0..4 with
/// timestamps 100..500 (step 100), partition 1 is empty.
pub async fn orders_cluster() -> Arc<MemoryCluster> {
    let cluster = MemoryCluster::default();
    cluster.create_topic("orders", 2).await.unwrap();
    for i in 0..5i64 {
        cluster
            .append("orders", 0, format!("order-{i}"), format!("status=paid;n={i}"), (i + 1) * 100)
            .await
            .unwrap();
    }
    Arc::new(cluster)
}

pub fn config(workers: usize) -> SearchConfig {
    SearchConfig {
        workers,
        ..SearchConfig::default()
    }
}

pub fn search_over(
    lookup: Arc<dyn ClusterOffsetLookup>,
    fetcher: Arc<dyn RecordFetcher>,
    config: &SearchConfig,
) -> MessageSearch {
    let pool = Arc::new(ScanPool::new(config.workers));
    MessageSearch::new(lookup, fetcher, pool, config).unwrap()
}

pub fn offsets(records: &[Record]) -> Vec<(u32, u64)> {
    records.iter().map(|r| (r.partition.partition, r.offset)).collect()
}

// ═══════════════════════════════════════════════════════════════
//  Wrapping collaborators
// ═══════════════════════════════════════════════════════════════

/// Fails every fetch that touches one of `failing` partitions.
pub struct FailingFetcher {
    pub inner: Arc<MemoryCluster>,
    pub failing: BTreeSet<u32>,
}

impl RecordFetcher for FailingFetcher {
    fn fetch(
        &self,
        ranges: &BTreeMap<PartitionRef, OffsetRange>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, ClusterError>> + Send + '_>> {
        let broken = ranges.keys().find(|p| self.failing.contains(&p.partition)).cloned();
        if let Some(p) = broken {
            return Box::pin(async move {
                Err(ClusterError::transport(format!("broker for {p} unreachable")))
            });
        }
        self.inner.fetch(ranges)
    }
}

/// Counts fetch calls and tracks peak concurrency.
pub struct CountingFetcher {
    pub inner: Arc<MemoryCluster>,
    pub delay: Duration,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(inner: Arc<MemoryCluster>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl RecordFetcher for CountingFetcher {
    fn fetch(
        &self,
        ranges: &BTreeMap<PartitionRef, OffsetRange>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, ClusterError>> + Send + '_>> {
        let ranges = ranges.clone();
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let result = self.inner.fetch(&ranges).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

/// Returns at most `limit` records per call, like a size-capped broker read.
pub struct ShortBatchFetcher {
    pub inner: Arc<MemoryCluster>,
    pub limit: usize,
    pub calls: AtomicUsize,
}

impl ShortBatchFetcher {
    pub fn new(inner: Arc<MemoryCluster>, limit: usize) -> Self {
        Self { inner, limit, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RecordFetcher for ShortBatchFetcher {
    fn fetch(
        &self,
        ranges: &BTreeMap<PartitionRef, OffsetRange>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, ClusterError>> + Send + '_>> {
        let ranges = ranges.clone();
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut records = self.inner.fetch(&ranges).await?;
            records.truncate(self.limit);
            Ok(records)
        })
    }
}

/// Never answers within any reasonable deadline.
pub struct StalledFetcher;

impl RecordFetcher for StalledFetcher {
    fn fetch(
        &self,
        _ranges: &BTreeMap<PartitionRef, OffsetRange>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, ClusterError>> + Send + '_>> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        })
    }
}

/// Records which partitions high-water marks were requested for.
pub struct RecordingLookup {
    pub inner: Arc<MemoryCluster>,
    pub end_offset_requests: Mutex<Vec<Vec<PartitionRef>>>,
}

impl RecordingLookup {
    pub fn new(inner: Arc<MemoryCluster>) -> Self {
        Self { inner, end_offset_requests: Mutex::new(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<Vec<PartitionRef>> {
        self.end_offset_requests.lock().unwrap().clone()
    }
}

impl ClusterOffsetLookup for RecordingLookup {
    fn offsets_for_times(
        &self,
        topic: &str,
        ts_ms: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<OffsetPoint>, ClusterError>> + Send + '_>> {
        self.inner.offsets_for_times(topic, ts_ms)
    }

    fn end_offsets(
        &self,
        partitions: &[PartitionRef],
    ) -> Pin<Box<dyn Future<Output = Result<BTreeMap<PartitionRef, u64>, ClusterError>> + Send + '_>>
    {
        self.end_offset_requests.lock().unwrap().push(partitions.to_vec());
        self.inner.end_offsets(partitions)
    }

    fn topic_end_offsets(
        &self,
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = Result<TopicOffsets, ClusterError>> + Send + '_>> {
        self.inner.topic_end_offsets(topic)
    }
}

/// Answers with gaps: offset-by-time lookups at or after `silent_from_ms`
/// report no partitions at all, and `end_offsets` leaves out the partitions
/// in `no_end_offset`.
pub struct SparseLookup {
    pub inner: Arc<MemoryCluster>,
    pub silent_from_ms: i64,
    pub no_end_offset: BTreeSet<u32>,
}

impl ClusterOffsetLookup for SparseLookup {
    fn offsets_for_times(
        &self,
        topic: &str,
        ts_ms: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<OffsetPoint>, ClusterError>> + Send + '_>> {
        if ts_ms >= self.silent_from_ms {
            return Box::pin(async { Ok(Vec::new()) });
        }
        self.inner.offsets_for_times(topic, ts_ms)
    }

    fn end_offsets(
        &self,
        partitions: &[PartitionRef],
    ) -> Pin<Box<dyn Future<Output = Result<BTreeMap<PartitionRef, u64>, ClusterError>> + Send + '_>>
    {
        let partitions = partitions.to_vec();
        Box::pin(async move {
            let mut marks = self.inner.end_offsets(&partitions).await?;
            marks.retain(|p, _| !self.no_end_offset.contains(&p.partition));
            Ok(marks)
        })
    }

    fn topic_end_offsets(
        &self,
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = Result<TopicOffsets, ClusterError>> + Send + '_>> {
        self.inner.topic_end_offsets(topic)
    }
}

/// Cluster that cannot be reached at all.
pub struct UnreachableLookup;

impl ClusterOffsetLookup for UnreachableLookup {
    fn offsets_for_times(
        &self,
        _topic: &str,
        _ts_ms: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<OffsetPoint>, ClusterError>> + Send + '_>> {
        Box::pin(async { Err(ClusterError::transport("connection refused")) })
    }

    fn end_offsets(
        &self,
        _partitions: &[PartitionRef],
    ) -> Pin<Box<dyn Future<Output = Result<BTreeMap<PartitionRef, u64>, ClusterError>> + Send + '_>>
    {
        Box::pin(async { Err(ClusterError::transport("connection refused")) })
    }

    fn topic_end_offsets(
        &self,
        _topic: &str,
    ) -> Pin<Box<dyn Future<Output = Result<TopicOffsets, ClusterError>> + Send + '_>> {
        Box::pin(async { Err(ClusterError::transport("connection refused")) })
    }
}
