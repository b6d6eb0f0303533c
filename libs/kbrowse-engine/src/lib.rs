pub mod config;
pub mod error;
pub mod planner;
pub mod pool;
pub mod resolver;
pub mod scanner;
pub mod search;

pub use config::SearchConfig;
pub use error::SearchError;
pub use planner::RangePlanner;
pub use pool::ScanPool;
pub use resolver::OffsetResolver;
pub use scanner::{PartitionFailure, PredicateScanner, SearchOutcome};
pub use search::MessageSearch;
