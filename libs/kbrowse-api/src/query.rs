use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Record;

// ════════════════════════════════════════════════════════════════
//  Query descriptor
// ════════════════════════════════════════════════════════════════

/// Kind of a message query as it arrives from the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Message,
    Key,
    #[serde(alias = "keyandmessage")]
    KeyAndMessage,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Message => f.write_str("message"),
            QueryKind::Key => f.write_str("key"),
            QueryKind::KeyAndMessage => f.write_str("key_and_message"),
        }
    }
}

impl FromStr for QueryKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "message" => Ok(QueryKind::Message),
            "key" => Ok(QueryKind::Key),
            "key_and_message" | "keyandmessage" => Ok(QueryKind::KeyAndMessage),
            _ => Err(QueryError::UnknownKind(s.to_string())),
        }
    }
}

/// Rejected query descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    UnknownKind(String),
    MissingKey,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::UnknownKind(kind) => write!(f, "unsupported message query kind '{kind}'"),
            QueryError::MissingKey => f.write_str("key_and_message query requires a key"),
        }
    }
}

impl std::error::Error for QueryError {}

/// A validated message query. The kind set is closed; each variant carries
/// exactly the payload its predicate needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageQuery {
    /// Value contains the fragment.
    Message { value: String },
    /// Key equals the value.
    Key { value: String },
    /// Key equals `key` and value contains `message`.
    KeyAndMessage { key: String, message: String },
}

impl MessageQuery {
    /// Assemble a query from loosely typed boundary parameters.
    pub fn from_parts(
        kind: QueryKind,
        value: String,
        key: Option<String>,
    ) -> Result<Self, QueryError> {
        match kind {
            QueryKind::Message => Ok(MessageQuery::Message { value }),
            QueryKind::Key => Ok(MessageQuery::Key { value }),
            QueryKind::KeyAndMessage => {
                let key = key.ok_or(QueryError::MissingKey)?;
                Ok(MessageQuery::KeyAndMessage { key, message: value })
            }
        }
    }

    pub fn kind(&self) -> QueryKind {
        match self {
            MessageQuery::Message { .. } => QueryKind::Message,
            MessageQuery::Key { .. } => QueryKind::Key,
            MessageQuery::KeyAndMessage { .. } => QueryKind::KeyAndMessage,
        }
    }

    /// Build the match predicate for this query.
    pub fn predicate(&self) -> MatchPredicate {
        match self {
            MessageQuery::Message { value } => MatchPredicate::ValueContains(value.as_bytes().to_vec()),
            MessageQuery::Key { value } => MatchPredicate::KeyEquals(value.as_bytes().to_vec()),
            MessageQuery::KeyAndMessage { key, message } => MatchPredicate::KeyEqualsAndValueContains {
                key: key.as_bytes().to_vec(),
                fragment: message.as_bytes().to_vec(),
            },
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  MatchPredicate
// ════════════════════════════════════════════════════════════════

/// Pure test over a record's key and value bytes.
///
/// Holds no mutable state, so one instance can be shared by every
/// partition scan of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchPredicate {
    KeyEquals(Vec<u8>),
    KeyContains(Vec<u8>),
    ValueContains(Vec<u8>),
    KeyEqualsAndValueContains { key: Vec<u8>, fragment: Vec<u8> },
}

impl MatchPredicate {
    pub fn matches(&self, key: &[u8], value: &[u8]) -> bool {
        match self {
            MatchPredicate::KeyEquals(expected) => key == expected.as_slice(),
            MatchPredicate::KeyContains(fragment) => contains(key, fragment),
            MatchPredicate::ValueContains(fragment) => contains(value, fragment),
            MatchPredicate::KeyEqualsAndValueContains { key: expected, fragment } => {
                key == expected.as_slice() && contains(value, fragment)
            }
        }
    }

    pub fn matches_record(&self, record: &Record) -> bool {
        self.matches(&record.key, &record.value)
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
