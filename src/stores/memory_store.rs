use crate::api::store::{
    is_server_timestamp, Direction, Fields, RawRecord, RemoteStore, StoreError, StoreResult,
    StoreTimestamp,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

const ID_LEN: usize = 20;

/// In-process document store
///
/// Collections map document ids to their fields. Server timestamp sentinels
/// are resolved from a monotonic clock, so two commits never share a time.
/// Reads and writes can be made to fail for testing error paths.
pub struct MemoryStore {
    collections: DashMap<String, DashMap<String, Fields>>,
    last_commit_micros: AtomicI64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            last_commit_micros: AtomicI64::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Insert a document verbatim, without resolving sentinels
    pub fn seed(&self, collection: &str, id: &str, fields: Fields) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Raw fields of a stored document
    pub fn raw(&self, collection: &str, id: &str) -> Option<Fields> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id).map(|doc| doc.value().clone()))
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(StoreError::Unreachable("read failure injected".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::Rejected {
                status: 503,
                message: "write failure injected".to_string(),
            });
        }
        Ok(())
    }

    /// Commit time for this write, strictly after every previous one
    fn commit_timestamp(&self) -> StoreTimestamp {
        let now = Utc::now().timestamp_micros();
        let mut last = self.last_commit_micros.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_commit_micros.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return StoreTimestamp {
                        seconds: next.div_euclid(1_000_000),
                        nanos: (next.rem_euclid(1_000_000) * 1_000) as u32,
                    }
                }
                Err(actual) => last = actual,
            }
        }
    }

    fn resolve_sentinels(&self, mut fields: Fields) -> Fields {
        if fields.values().any(is_server_timestamp) {
            let commit = self.commit_timestamp().to_value();
            for value in fields.values_mut() {
                if is_server_timestamp(value) {
                    *value = commit.clone();
                }
            }
        }
        fields
    }

    fn generate_id() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(ID_LEN)
            .map(char::from)
            .collect()
    }

    fn snapshot(&self, collection: &str) -> Vec<RawRecord> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|entry| RawRecord {
                        id: entry.key().clone(),
                        fields: entry.value().clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Order field values the way a document store does: missing values first,
/// then numbers, strings and timestamp objects compared by their contents
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (None, None) => CmpOrdering::Equal,
        (None, Some(_)) => CmpOrdering::Less,
        (Some(_), None) => CmpOrdering::Greater,
        (Some(a), Some(b)) => {
            if let (Some(a), Some(b)) = (StoreTimestamp::from_value(a), StoreTimestamp::from_value(b)) {
                return a.cmp(&b);
            }
            match (a, b) {
                (Value::String(a), Value::String(b)) => a.cmp(b),
                (Value::Number(a), Value::Number(b)) => a
                    .as_f64()
                    .partial_cmp(&b.as_f64())
                    .unwrap_or(CmpOrdering::Equal),
                _ => a.to_string().cmp(&b.to_string()),
            }
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_all(
        &self,
        collection: &str,
        order_by: &str,
        direction: Direction,
    ) -> StoreResult<Vec<RawRecord>> {
        self.check_read()?;

        let mut records = self.snapshot(collection);
        records.sort_by(|a, b| {
            let ord = compare_values(a.fields.get(order_by), b.fields.get(order_by))
                .then_with(|| a.id.cmp(&b.id));
            match direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });

        Ok(records)
    }

    async fn get_one(&self, collection: &str, id: &str) -> StoreResult<Option<RawRecord>> {
        self.check_read()?;

        Ok(self.raw(collection, id).map(|fields| RawRecord {
            id: id.to_string(),
            fields,
        }))
    }

    async fn insert(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        self.check_write()?;

        let docs = self.collections.entry(collection.to_string()).or_default();
        let mut id = Self::generate_id();
        while docs.contains_key(&id) {
            id = Self::generate_id();
        }
        docs.insert(id.clone(), self.resolve_sentinels(fields));

        Ok(id)
    }

    async fn update_fields(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        self.check_write()?;

        let docs = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut doc = docs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        // Merge under the entry lock so readers never see a half-applied update
        for (key, value) in self.resolve_sentinels(fields) {
            doc.insert(key, value);
        }

        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.check_write()?;

        if let Some(docs) = self.collections.get(collection) {
            docs.remove(id);
        }

        Ok(())
    }

    async fn range_query(
        &self,
        collection: &str,
        field: &str,
        lower: &str,
        upper: &str,
        limit: usize,
    ) -> StoreResult<Vec<RawRecord>> {
        self.check_read()?;

        let mut records: Vec<RawRecord> = self
            .snapshot(collection)
            .into_iter()
            .filter(|record| {
                record
                    .fields
                    .get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|value| value >= lower && value <= upper)
            })
            .collect();
        records.sort_by(|a, b| {
            compare_values(a.fields.get(field), b.fields.get(field)).then_with(|| a.id.cmp(&b.id))
        });
        records.truncate(limit);

        Ok(records)
    }
}
