use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use tokio::sync::RwLock;

use kbrowse_api::{
    ClusterError, ClusterOffsetLookup, OffsetPoint, OffsetRange, PartitionRef, Record,
    RecordFetcher, TopicOffsets,
};

// ═══════════════════════════════════════════════════════════════
//  MemoryClusterConfig
// ═══════════════════════════════════════════════════════════════

fn default_retention_records() -> usize {
    100_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryClusterConfig {
    /// Records kept per partition before the log start advances.
    #[serde(default = "default_retention_records")]
    pub retention_records: usize,
}

impl Default for MemoryClusterConfig {
    fn default() -> Self {
        Self {
            retention_records: default_retention_records(),
        }
    }
}

/// One line of a JSON-lines seed file.
#[derive(Debug, Deserialize)]
pub struct SeedRecord {
    pub partition: u32,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    pub ts_ms: i64,
}

// ═══════════════════════════════════════════════════════════════
//  PartitionLog
// ═══════════════════════════════════════════════════════════════

struct StoredRecord {
    ts_ms: i64,
    key: Vec<u8>,
    value: Vec<u8>,
}

/// Append-only log with a retention bound. Offsets never move: when the
/// oldest record is evicted the log start advances instead.
struct PartitionLog {
    log_start: u64,
    records: VecDeque<StoredRecord>,
    retention: usize,
}

impl PartitionLog {
    fn new(retention: usize) -> Self {
        Self { log_start: 0, records: VecDeque::new(), retention: retention.max(1) }
    }

    fn high_water_mark(&self) -> u64 {
        self.log_start + self.records.len() as u64
    }

    fn append(&mut self, record: StoredRecord) -> u64 {
        let offset = self.high_water_mark();
        if self.records.len() >= self.retention {
            self.records.pop_front();
            self.log_start += 1;
        }
        self.records.push_back(record);
        offset
    }

    fn offset_for_time(&self, ts_ms: i64) -> Option<(u64, i64)> {
        self.records
            .iter()
            .enumerate()
            .find(|(_, r)| r.ts_ms >= ts_ms)
            .map(|(i, r)| (self.log_start + i as u64, r.ts_ms))
    }

    fn read(&self, partition: &PartitionRef, range: OffsetRange) -> Vec<Record> {
        let start = range.start.max(self.log_start);
        let clamped = OffsetRange::new(start, range.end.min(self.high_water_mark()));
        if clamped.is_empty() {
            return Vec::new();
        }
        let skip = (start - self.log_start) as usize;
        self.records
            .iter()
            .skip(skip)
            .take(clamped.len() as usize)
            .enumerate()
            .map(|(i, r)| Record {
                partition: partition.clone(),
                offset: start + i as u64,
                ts_ms: r.ts_ms,
                key: r.key.clone(),
                value: r.value.clone(),
            })
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryCluster
// ═══════════════════════════════════════════════════════════════

/// In-process cluster: named topics split into partition logs.
///
/// Implements both collaborator traits the search engine consumes, so it
/// stands in for a broker connection in tests and local runs.
pub struct MemoryCluster {
    topics: RwLock<HashMap<String, Vec<PartitionLog>>>,
    retention_records: usize,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new(MemoryClusterConfig::default())
    }
}

impl MemoryCluster {
    pub fn new(config: MemoryClusterConfig) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            retention_records: config.retention_records.max(1),
        }
    }

    pub async fn create_topic(&self, name: &str, partitions: u32) -> Result<(), ClusterError> {
        self.create_topic_with_retention(name, partitions, self.retention_records).await
    }

    /// Create a topic whose partitions keep `retention_records` records
    /// instead of the cluster-wide bound.
    pub async fn create_topic_with_retention(
        &self,
        name: &str,
        partitions: u32,
        retention_records: usize,
    ) -> Result<(), ClusterError> {
        let mut topics = self.topics.write().await;
        if topics.contains_key(name) {
            return Err(ClusterError::logic(format!("topic '{name}' already exists")));
        }
        let logs = (0..partitions).map(|_| PartitionLog::new(retention_records)).collect();
        topics.insert(name.to_string(), logs);
        tracing::debug!(topic = %name, partitions, retention_records, "created topic");
        Ok(())
    }

    /// Append a record and return its offset.
    pub async fn append(
        &self,
        topic: &str,
        partition: u32,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
        ts_ms: i64,
    ) -> Result<u64, ClusterError> {
        let mut topics = self.topics.write().await;
        let logs = topics
            .get_mut(topic)
            .ok_or_else(|| ClusterError::not_found(format!("topic '{topic}'")))?;
        let log = logs
            .get_mut(partition as usize)
            .ok_or_else(|| ClusterError::not_found(format!("partition {topic}-{partition}")))?;
        let record = StoredRecord { ts_ms, key: key.into(), value: value.into() };
        Ok(log.append(record))
    }

    /// Load JSON-lines seed data into an existing topic. Blank lines are
    /// skipped. Returns the number of records appended.
    pub async fn seed_from_jsonl(&self, topic: &str, content: &str) -> Result<usize, ClusterError> {
        let mut count = 0;
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let seed: SeedRecord = serde_json::from_str(line)
                .map_err(|e| ClusterError::logic(format!("seed line {}: {e}", line_no + 1)))?;
            self.append(
                topic,
                seed.partition,
                seed.key.unwrap_or_default(),
                seed.value.unwrap_or_default(),
                seed.ts_ms,
            )
            .await?;
            count += 1;
        }
        Ok(count)
    }
}

impl ClusterOffsetLookup for MemoryCluster {
    fn offsets_for_times(
        &self,
        topic: &str,
        ts_ms: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<OffsetPoint>, ClusterError>> + Send + '_>> {
        let topic = topic.to_string();
        Box::pin(async move {
            let topics = self.topics.read().await;
            let logs = topics
                .get(&topic)
                .ok_or_else(|| ClusterError::not_found(format!("topic '{topic}'")))?;
            let points = logs
                .iter()
                .enumerate()
                .map(|(i, log)| {
                    let partition = PartitionRef::new(topic.clone(), i as u32);
                    match log.offset_for_time(ts_ms) {
                        Some((offset, ts)) => OffsetPoint::found(partition, offset, ts),
                        None => OffsetPoint::missing(partition),
                    }
                })
                .collect();
            Ok(points)
        })
    }

    fn end_offsets(
        &self,
        partitions: &[PartitionRef],
    ) -> Pin<Box<dyn Future<Output = Result<BTreeMap<PartitionRef, u64>, ClusterError>> + Send + '_>> {
        let partitions = partitions.to_vec();
        Box::pin(async move {
            let topics = self.topics.read().await;
            let marks = partitions
                .into_iter()
                .filter_map(|p| {
                    let log = topics.get(&p.topic)?.get(p.partition as usize)?;
                    let mark = log.high_water_mark();
                    Some((p, mark))
                })
                .collect();
            Ok(marks)
        })
    }

    fn topic_end_offsets(
        &self,
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = Result<TopicOffsets, ClusterError>> + Send + '_>> {
        let topic = topic.to_string();
        Box::pin(async move {
            let topics = self.topics.read().await;
            let logs = topics
                .get(&topic)
                .ok_or_else(|| ClusterError::not_found(format!("topic '{topic}'")))?;
            let offsets = logs.iter().map(PartitionLog::high_water_mark).collect();
            Ok(TopicOffsets::new(topic, offsets))
        })
    }
}

impl RecordFetcher for MemoryCluster {
    fn fetch(
        &self,
        ranges: &BTreeMap<PartitionRef, OffsetRange>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, ClusterError>> + Send + '_>> {
        let ranges = ranges.clone();
        Box::pin(async move {
            let topics = self.topics.read().await;
            let mut records = Vec::new();
            for (partition, range) in &ranges {
                let log = topics
                    .get(&partition.topic)
                    .and_then(|logs| logs.get(partition.partition as usize))
                    .ok_or_else(|| ClusterError::not_found(format!("partition {partition}")))?;
                records.extend(log.read(partition, *range));
            }
            Ok(records)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn orders() -> MemoryCluster {
        let cluster = MemoryCluster::default();
        cluster.create_topic("orders", 2).await.unwrap();
        for i in 0..5u64 {
            cluster
                .append("orders", 0, format!("k{i}"), format!("v{i}"), (i as i64 + 1) * 100)
                .await
                .unwrap();
        }
        cluster
    }

    #[tokio::test]
    async fn offsets_for_times_finds_first_at_or_after() {
        let cluster = orders().await;
        let points = cluster.offsets_for_times("orders", 250).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], OffsetPoint::found(PartitionRef::new("orders", 0), 2, 300));
        assert_eq!(points[1], OffsetPoint::missing(PartitionRef::new("orders", 1)));

        let exact = cluster.offsets_for_times("orders", 300).await.unwrap();
        assert_eq!(exact[0].offset, Some(2));

        let past = cluster.offsets_for_times("orders", 501).await.unwrap();
        assert_eq!(past[0].offset, None);
    }

    #[tokio::test]
    async fn unknown_topic_is_not_found() {
        let cluster = orders().await;
        let err = cluster.offsets_for_times("payments", 0).await.unwrap_err();
        assert_eq!(err.kind, kbrowse_api::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn end_offsets_omit_unknown_partitions() {
        let cluster = orders().await;
        let marks = cluster
            .end_offsets(&[
                PartitionRef::new("orders", 0),
                PartitionRef::new("orders", 1),
                PartitionRef::new("orders", 9),
            ])
            .await
            .unwrap();
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[&PartitionRef::new("orders", 0)], 5);
        assert_eq!(marks[&PartitionRef::new("orders", 1)], 0);

        let summary = cluster.topic_end_offsets("orders").await.unwrap();
        assert_eq!(summary.offsets, vec![5, 0]);
        assert_eq!(summary.offset_sum, 5);
    }

    #[tokio::test]
    async fn fetch_reads_half_open_ranges() {
        let cluster = orders().await;
        let p0 = PartitionRef::new("orders", 0);
        let ranges = BTreeMap::from([(p0.clone(), OffsetRange::new(1, 3))]);
        let records = cluster.fetch(&ranges).await.unwrap();
        let offsets: Vec<u64> = records.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![1, 2]);
        assert_eq!(records[0].key, b"k1");

        let beyond = BTreeMap::from([(p0, OffsetRange::new(4, 50))]);
        assert_eq!(cluster.fetch(&beyond).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn retention_advances_log_start() {
        let cluster = MemoryCluster::new(MemoryClusterConfig { retention_records: 3 });
        cluster.create_topic("t", 1).await.unwrap();
        for i in 0..5 {
            cluster.append("t", 0, "", "", i * 10).await.unwrap();
        }
        let p = PartitionRef::new("t", 0);
        let marks = cluster.end_offsets(std::slice::from_ref(&p)).await.unwrap();
        assert_eq!(marks[&p], 5);

        let points = cluster.offsets_for_times("t", 0).await.unwrap();
        assert_eq!(points[0].offset, Some(2));

        let ranges = BTreeMap::from([(p, OffsetRange::new(0, 5))]);
        let offsets: Vec<u64> = cluster.fetch(&ranges).await.unwrap().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn topic_retention_overrides_cluster_bound() {
        let cluster = MemoryCluster::new(MemoryClusterConfig { retention_records: 100 });
        cluster.create_topic_with_retention("short", 1, 2).await.unwrap();
        cluster.create_topic("long", 1).await.unwrap();
        for i in 0..4 {
            cluster.append("short", 0, "", "", i).await.unwrap();
            cluster.append("long", 0, "", "", i).await.unwrap();
        }
        let short = cluster.offsets_for_times("short", 0).await.unwrap();
        let long = cluster.offsets_for_times("long", 0).await.unwrap();
        assert_eq!(short[0].offset, Some(2));
        assert_eq!(long[0].offset, Some(0));
    }

    #[tokio::test]
    async fn seeds_from_json_lines() {
        let cluster = MemoryCluster::default();
        cluster.create_topic("orders", 2).await.unwrap();
        let content = r#"
{"partition":0,"key":"order-1","value":"paid","ts_ms":100}

{"partition":1,"value":"no key","ts_ms":200}
"#;
        assert_eq!(cluster.seed_from_jsonl("orders", content).await.unwrap(), 2);
        let summary = cluster.topic_end_offsets("orders").await.unwrap();
        assert_eq!(summary.offsets, vec![1, 1]);

        let bad = cluster.seed_from_jsonl("orders", "{oops}").await.unwrap_err();
        assert!(bad.message.starts_with("seed line 1"));
    }
}
