use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════
//  PartitionRef
// ════════════════════════════════════════════════════════════════

/// Identity of one partition of a topic. Ordered by (topic, partition).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionRef {
    pub topic: String,
    pub partition: u32,
}

impl PartitionRef {
    pub fn new(topic: impl Into<String>, partition: u32) -> Self {
        Self { topic: topic.into(), partition }
    }
}

impl fmt::Display for PartitionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

// ════════════════════════════════════════════════════════════════
//  Offsets
// ════════════════════════════════════════════════════════════════

/// Result of an offset-by-time lookup for one partition.
///
/// `offset == None` means the partition holds no record at or after the
/// requested time (the time is past the last record, or the partition is
/// empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetPoint {
    pub partition: PartitionRef,
    pub offset: Option<u64>,
    /// Timestamp of the record at `offset`, when the cluster reports one.
    pub ts_ms: Option<i64>,
}

impl OffsetPoint {
    pub fn found(partition: PartitionRef, offset: u64, ts_ms: i64) -> Self {
        Self { partition, offset: Some(offset), ts_ms: Some(ts_ms) }
    }

    pub fn missing(partition: PartitionRef) -> Self {
        Self { partition, offset: None, ts_ms: None }
    }
}

/// Half-open offset range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetRange {
    pub start: u64,
    pub end: u64,
}

impl OffsetRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// Closed set of offsets to scan in one partition: `[from_offset, to_offset)`.
///
/// `to_offset` is always concrete. The planner substitutes the high-water
/// mark before a window is built, so no window carries an open end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchWindow {
    partition: PartitionRef,
    from_offset: u64,
    to_offset: u64,
}

impl SearchWindow {
    /// Returns `None` when `to_offset < from_offset`.
    pub fn new(partition: PartitionRef, from_offset: u64, to_offset: u64) -> Option<Self> {
        (to_offset >= from_offset).then_some(Self { partition, from_offset, to_offset })
    }

    pub fn partition(&self) -> &PartitionRef {
        &self.partition
    }

    pub fn from_offset(&self) -> u64 {
        self.from_offset
    }

    pub fn to_offset(&self) -> u64 {
        self.to_offset
    }

    pub fn range(&self) -> OffsetRange {
        OffsetRange::new(self.from_offset, self.to_offset)
    }

    /// A window with `from == to` yields no records.
    pub fn is_empty(&self) -> bool {
        self.from_offset == self.to_offset
    }
}

/// Aggregate high-water marks of a whole topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicOffsets {
    pub topic: String,
    /// Sum of all partition high-water marks.
    pub offset_sum: u64,
    /// High-water mark per partition, indexed by partition number.
    pub offsets: Vec<u64>,
}

impl TopicOffsets {
    pub fn new(topic: impl Into<String>, offsets: Vec<u64>) -> Self {
        Self {
            topic: topic.into(),
            offset_sum: offsets.iter().sum(),
            offsets,
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Record
// ════════════════════════════════════════════════════════════════

/// One record read from a partition log. Key and value are opaque bytes;
/// an absent key or value is represented as empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub partition: PartitionRef,
    pub offset: u64,
    /// Timestamp in milliseconds (Unix epoch).
    pub ts_ms: i64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Serializes opaque bytes as `{"format":"utf8","data":"..."}` when they
/// are valid UTF-8 and as `{"format":"base64","data":"..."}` otherwise.
struct Payload<'a>(&'a [u8]);

impl Serialize for Payload<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Payload", 2)?;
        match std::str::from_utf8(self.0) {
            Ok(text) => {
                s.serialize_field("format", "utf8")?;
                s.serialize_field("data", text)?;
            }
            Err(_) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(self.0);
                s.serialize_field("format", "base64")?;
                s.serialize_field("data", &encoded)?;
            }
        }
        s.end()
    }
}

impl Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Record", 6)?;
        s.serialize_field("topic", &self.partition.topic)?;
        s.serialize_field("partition", &self.partition.partition)?;
        s.serialize_field("offset", &self.offset)?;
        s.serialize_field("ts_ms", &self.ts_ms)?;
        s.serialize_field("key", &Payload(&self.key))?;
        s.serialize_field("value", &Payload(&self.value))?;
        s.end()
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
