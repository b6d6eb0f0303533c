use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use crate::error::ClusterError;
use crate::types::{OffsetPoint, OffsetRange, PartitionRef, Record, TopicOffsets};

// ════════════════════════════════════════════════════════════════
//  Cluster collaborator traits
// ════════════════════════════════════════════════════════════════

/// Offset index of the cluster.
///
/// Every call is a point read: results may be stale as soon as they
/// return if producers keep writing.
pub trait ClusterOffsetLookup: Send + Sync {
    /// For every partition of `topic`, the earliest offset whose record
    /// timestamp is `>= ts_ms`. Partitions with no such record are reported
    /// with `offset == None`.
    fn offsets_for_times(
        &self,
        topic: &str,
        ts_ms: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<OffsetPoint>, ClusterError>> + Send + '_>>;

    /// High-water mark (one past the last written offset) of each given
    /// partition. Partitions the cluster does not know are left out.
    fn end_offsets(
        &self,
        partitions: &[PartitionRef],
    ) -> Pin<Box<dyn Future<Output = Result<BTreeMap<PartitionRef, u64>, ClusterError>> + Send + '_>>;

    /// High-water marks of every partition of `topic`, with their sum.
    fn topic_end_offsets(
        &self,
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = Result<TopicOffsets, ClusterError>> + Send + '_>>;
}

/// Reads records from partition logs.
pub trait RecordFetcher: Send + Sync {
    /// Fetch the records in each `[start, end)` range, batching across the
    /// given partitions. Records of one partition come back in offset order.
    ///
    /// A fetch may stop short of `end` (size-capped reads); callers resume
    /// after the last offset returned. An empty answer for a range means it
    /// holds no readable records.
    fn fetch(
        &self,
        ranges: &BTreeMap<PartitionRef, OffsetRange>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, ClusterError>> + Send + '_>>;
}
