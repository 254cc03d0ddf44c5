use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Document fields as they travel to and from the store
pub type Fields = Map<String, Value>;

/// Key marking a field value the store must replace with its commit time
const SERVER_VALUE_KEY: &str = "__serverValue";
const REQUEST_TIME: &str = "REQUEST_TIME";

/// Sort direction for `list_all`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// A document exactly as the store returns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

/// Store-native timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreTimestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl StoreTimestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos)
    }

    /// Read a timestamp field. Absent, null or unresolved values give `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if is_server_timestamp(value) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> Value {
        json!({ "seconds": self.seconds, "nanos": self.nanos })
    }
}

impl From<DateTime<Utc>> for StoreTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos(),
        }
    }
}

/// Sentinel asking the store to stamp the field with its commit time
pub fn server_timestamp() -> Value {
    json!({ SERVER_VALUE_KEY: REQUEST_TIME })
}

pub fn is_server_timestamp(value: &Value) -> bool {
    value
        .get(SERVER_VALUE_KEY)
        .and_then(Value::as_str)
        .is_some_and(|v| v == REQUEST_TIME)
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    #[error("Store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Failed to decode store response: {0}")]
    Decode(String),

    #[error("Invalid document path segment: '{0}'")]
    InvalidPath(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Client for the remote document database.
///
/// The store owns storage, indexing and per-document write ordering; this
/// trait only names the primitives the repository needs.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_all(
        &self,
        collection: &str,
        order_by: &str,
        direction: Direction,
    ) -> StoreResult<Vec<RawRecord>>;

    async fn get_one(&self, collection: &str, id: &str) -> StoreResult<Option<RawRecord>>;

    /// Persist a new document and return its generated id
    async fn insert(&self, collection: &str, fields: Fields) -> StoreResult<String>;

    /// Atomic merge-update of a single document
    async fn update_fields(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;

    /// Delete a document; removing a missing id succeeds
    async fn remove(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Documents whose `field` lies in `[lower, upper]`, at most `limit` of them
    async fn range_query(
        &self,
        collection: &str,
        field: &str,
        lower: &str,
        upper: &str,
        limit: usize,
    ) -> StoreResult<Vec<RawRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_timestamp_sentinel() {
        let sentinel = server_timestamp();
        assert!(is_server_timestamp(&sentinel));
        assert!(!is_server_timestamp(&json!("REQUEST_TIME")));
        assert_eq!(StoreTimestamp::from_value(&sentinel), None);
    }

    #[test]
    fn test_timestamp_conversion() {
        let dt = "2024-03-10T12:30:45.250Z".parse::<DateTime<Utc>>().unwrap();
        let ts = StoreTimestamp::from(dt);

        assert_eq!(ts.nanos, 250_000_000);
        assert_eq!(ts.to_datetime(), Some(dt));

        let round = StoreTimestamp::from_value(&ts.to_value()).unwrap();
        assert_eq!(round, ts);
    }

    #[test]
    fn test_timestamp_from_garbage() {
        assert_eq!(StoreTimestamp::from_value(&Value::Null), None);
        assert_eq!(StoreTimestamp::from_value(&json!("yesterday")), None);
    }
}
