use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use kbrowse_api::{ClusterError, ClusterOffsetLookup, OffsetPoint, PartitionRef, TopicOffsets};

/// Maps a point in time to per-partition offsets and reports high-water
/// marks. Thin layer over [`ClusterOffsetLookup`] that keys results by
/// partition and drops anything the cluster did not report for the topic.
#[derive(Clone)]
pub struct OffsetResolver {
    lookup: Arc<dyn ClusterOffsetLookup>,
}

impl OffsetResolver {
    pub fn new(lookup: Arc<dyn ClusterOffsetLookup>) -> Self {
        Self { lookup }
    }

    /// Earliest offset at or after `ts_ms` for every partition of `topic`.
    pub async fn resolve_by_time(
        &self,
        topic: &str,
        ts_ms: i64,
    ) -> Result<BTreeMap<PartitionRef, OffsetPoint>, ClusterError> {
        let points = self
            .lookup
            .offsets_for_times(topic, ts_ms)
            .await
            .map_err(|e| e.with_context(format!("offsets for {topic} at {ts_ms}")))?;
        Ok(points
            .into_iter()
            .filter(|p| p.partition.topic == topic)
            .map(|p| (p.partition.clone(), p))
            .collect())
    }

    /// High-water mark of each partition in `partitions`. Partitions absent
    /// from the cluster are absent from the result.
    pub async fn high_water_marks(
        &self,
        partitions: &BTreeSet<PartitionRef>,
    ) -> Result<BTreeMap<PartitionRef, u64>, ClusterError> {
        if partitions.is_empty() {
            return Ok(BTreeMap::new());
        }
        let requested: Vec<PartitionRef> = partitions.iter().cloned().collect();
        let marks = self
            .lookup
            .end_offsets(&requested)
            .await
            .map_err(|e| e.with_context("end offsets"))?;
        Ok(marks
            .into_iter()
            .filter(|(p, _)| partitions.contains(p))
            .collect())
    }

    /// Sum and per-partition list of high-water marks for a whole topic.
    pub async fn topic_offsets(&self, topic: &str) -> Result<TopicOffsets, ClusterError> {
        self.lookup
            .topic_end_offsets(topic)
            .await
            .map_err(|e| e.with_context(format!("end offsets for {topic}")))
    }
}
