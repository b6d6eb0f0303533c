pub mod cluster;
pub mod error;
pub mod query;
pub mod types;

pub use cluster::{ClusterOffsetLookup, RecordFetcher};
pub use error::{ClusterError, ErrorKind};
pub use query::{MatchPredicate, MessageQuery, QueryError, QueryKind};
pub use types::{
    now_ms, OffsetPoint, OffsetRange, PartitionRef, Record, SearchWindow, TopicOffsets,
};
