use crate::api::store::{
    server_timestamp, Direction, Fields, RawRecord, RemoteStore, StoreError, StoreTimestamp,
};
use crate::core::error::RepositoryError;
use crate::models::user::{CreateUserData, User, UserPatch, UserStatus};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_COLLECTION: &str = "users";

/// Default cap on prefix search results
pub const SEARCH_LIMIT: usize = 20;

/// Appended to a search term to form the upper bound of its prefix range
const HIGH_SENTINEL: char = '\u{f8ff}';

const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Translates between raw store documents and `User` records
pub struct UserRepository {
    store: Arc<dyn RemoteStore>,
    collection: String,
    search_limit: usize,
}

impl UserRepository {
    pub fn new(store: Arc<dyn RemoteStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            search_limit: SEARCH_LIMIT,
        }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// All users, newest first
    pub async fn list(&self) -> RepoResult<Vec<User>> {
        debug!(collection = %self.collection, "Fetching all users");

        let records = self
            .store
            .list_all(&self.collection, CREATED_AT, Direction::Desc)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch users");
                RepositoryError::RemoteUnavailable(e)
            })?;

        let users = decode_records(records);
        debug!(count = users.len(), "Fetched users");

        Ok(users)
    }

    /// `Ok(None)` when no document has this id
    pub async fn get_by_id(&self, id: &str) -> RepoResult<Option<User>> {
        debug!(user_id = id, "Fetching user");

        let record = self
            .store
            .get_one(&self.collection, id)
            .await
            .map_err(|e| {
                warn!(user_id = id, error = %e, "Failed to fetch user");
                RepositoryError::RemoteUnavailable(e)
            })?;

        Ok(record.and_then(|r| decode_record(r, Utc::now())))
    }

    /// Persist a new user.
    ///
    /// The store stamps both timestamps at commit time; the returned user
    /// carries the local call time instead, which the next full listing
    /// replaces with the stored values.
    pub async fn create(&self, data: CreateUserData) -> RepoResult<User> {
        let mut fields = data_fields(&data);
        fields.insert(CREATED_AT.to_string(), server_timestamp());
        fields.insert(UPDATED_AT.to_string(), server_timestamp());

        let id = self
            .store
            .insert(&self.collection, fields)
            .await
            .map_err(|e| {
                warn!(name = %data.name, error = %e, "Failed to create user");
                RepositoryError::RemoteWriteFailed(e)
            })?;

        let now = Utc::now();
        info!(user_id = %id, name = %data.name, "User created");

        Ok(User {
            id,
            name: data.name,
            email: data.email,
            phone: data.phone,
            address: data.address,
            status: data.status,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update as one document write.
    ///
    /// `UserPatch` carries no `id` or `createdAt`, so neither can be
    /// overwritten. On failure the stored document is left as it was.
    pub async fn update(&self, id: &str, patch: &UserPatch) -> RepoResult<User> {
        let mut fields = patch_fields(patch);
        fields.insert(UPDATED_AT.to_string(), server_timestamp());

        self.store
            .update_fields(&self.collection, id, fields)
            .await
            .map_err(|e| {
                warn!(user_id = id, error = %e, "Failed to update user");
                RepositoryError::RemoteWriteFailed(e)
            })?;

        let now = Utc::now();
        let record = self
            .store
            .get_one(&self.collection, id)
            .await
            .map_err(RepositoryError::RemoteWriteFailed)?
            .ok_or_else(|| RepositoryError::RemoteWriteFailed(StoreError::NotFound(id.to_string())))?;

        let mut user = decode_record(record, now).ok_or_else(|| {
            RepositoryError::RemoteWriteFailed(StoreError::Decode(format!(
                "document {} is not a valid user",
                id
            )))
        })?;
        user.updated_at = now;

        info!(user_id = id, "User updated");
        Ok(user)
    }

    /// Permanently remove a user
    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        self.store.remove(&self.collection, id).await.map_err(|e| {
            warn!(user_id = id, error = %e, "Failed to delete user");
            RepositoryError::RemoteWriteFailed(e)
        })?;

        info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Users whose name starts with `term`, up to the search limit.
    ///
    /// This is a lexicographic prefix range over `name`, not substring or
    /// full-text search: "nn" does not find "Ann", and matching is
    /// case-sensitive. A backing store with real full-text search would need
    /// a different query here.
    pub async fn search(&self, term: &str) -> RepoResult<Vec<User>> {
        let upper = format!("{}{}", term, HIGH_SENTINEL);
        debug!(term = term, limit = self.search_limit, "Searching users by name prefix");

        let records = self
            .store
            .range_query(&self.collection, "name", term, &upper, self.search_limit)
            .await
            .map_err(|e| {
                warn!(term = term, error = %e, "Failed to search users");
                RepositoryError::RemoteUnavailable(e)
            })?;

        Ok(decode_records(records))
    }
}

fn data_fields(data: &CreateUserData) -> Fields {
    let mut fields = Fields::new();
    fields.insert("name".to_string(), Value::from(data.name.clone()));
    fields.insert("email".to_string(), Value::from(data.email.clone()));
    if let Some(phone) = &data.phone {
        fields.insert("phone".to_string(), Value::from(phone.clone()));
    }
    if let Some(address) = &data.address {
        fields.insert("address".to_string(), Value::from(address.clone()));
    }
    fields.insert("status".to_string(), Value::from(data.status.as_str()));
    fields
}

fn patch_fields(patch: &UserPatch) -> Fields {
    let mut fields = Fields::new();
    if let Some(name) = &patch.name {
        fields.insert("name".to_string(), Value::from(name.clone()));
    }
    if let Some(email) = &patch.email {
        fields.insert("email".to_string(), Value::from(email.clone()));
    }
    if let Some(phone) = &patch.phone {
        fields.insert("phone".to_string(), optional_text(phone));
    }
    if let Some(address) = &patch.address {
        fields.insert("address".to_string(), optional_text(address));
    }
    if let Some(status) = patch.status {
        fields.insert("status".to_string(), Value::from(status.as_str()));
    }
    fields
}

/// Blank strings clear the stored field
fn optional_text(value: &str) -> Value {
    if value.trim().is_empty() {
        Value::Null
    } else {
        Value::from(value.to_string())
    }
}

fn decode_records(records: Vec<RawRecord>) -> Vec<User> {
    let now = Utc::now();
    records
        .into_iter()
        .filter_map(|record| decode_record(record, now))
        .collect()
}

/// Build a `User` from a raw document.
///
/// Timestamps the store has not materialized yet fall back to `now`.
/// Documents without a usable name, email or status are skipped.
fn decode_record(record: RawRecord, now: DateTime<Utc>) -> Option<User> {
    let RawRecord { id, fields } = record;

    let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
    let timestamp = |key: &str| {
        fields
            .get(key)
            .and_then(StoreTimestamp::from_value)
            .and_then(|ts| ts.to_datetime())
            .unwrap_or(now)
    };

    let (Some(name), Some(email)) = (text("name"), text("email")) else {
        warn!(user_id = %id, "Skipping document without name or email");
        return None;
    };

    let status = match text("status").map(|s| s.parse::<UserStatus>()) {
        Some(Ok(status)) => status,
        Some(Err(e)) => {
            warn!(user_id = %id, error = %e, "Skipping document with invalid status");
            return None;
        }
        None => {
            warn!(user_id = %id, "Skipping document without status");
            return None;
        }
    };

    Some(User {
        name,
        email,
        phone: text("phone").filter(|p| !p.is_empty()),
        address: text("address").filter(|a| !a.is_empty()),
        status,
        created_at: timestamp(CREATED_AT),
        updated_at: timestamp(UPDATED_AT),
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory_store::MemoryStore;
    use serde_json::json;

    fn setup() -> (Arc<MemoryStore>, UserRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = UserRepository::new(store.clone(), DEFAULT_COLLECTION);
        (store, repo)
    }

    fn create_data(name: &str, status: UserStatus) -> CreateUserData {
        CreateUserData {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: Some("+15550100".to_string()),
            address: Some("1 Main St".to_string()),
            status,
        }
    }

    fn seed_fields(value: serde_json::Value) -> Fields {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let (_store, repo) = setup();

        let created = repo.create(create_data("Ann", UserStatus::Active)).await.unwrap();
        assert!(!created.id.is_empty());

        let users = repo.list().await.unwrap();
        assert_eq!(users.len(), 1);

        let stored = &users[0];
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.name, "Ann");
        assert_eq!(stored.email, "ann@example.com");
        assert_eq!(stored.phone.as_deref(), Some("+15550100"));
        assert_eq!(stored.address.as_deref(), Some("1 Main St"));
        assert_eq!(stored.status, UserStatus::Active);
        assert!(stored.created_at <= stored.updated_at);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (_store, repo) = setup();

        let first = repo.create(create_data("Ann", UserStatus::Active)).await.unwrap();
        let second = repo.create(create_data("Bo", UserStatus::Inactive)).await.unwrap();

        let ids: Vec<_> = repo.list().await.unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_update_preserves_created_at() {
        let (_store, repo) = setup();

        let created = repo.create(create_data("Ann", UserStatus::Active)).await.unwrap();
        let before = repo.get_by_id(&created.id).await.unwrap().unwrap();

        let patch = UserPatch {
            name: Some("Annie".to_string()),
            status: Some(UserStatus::Inactive),
            ..Default::default()
        };
        let returned = repo.update(&created.id, &patch).await.unwrap();
        assert_eq!(returned.created_at, before.created_at);

        let after = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.name, "Annie");
        assert_eq!(after.status, UserStatus::Inactive);
        assert_eq!(after.email, before.email);
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn test_update_clears_optional_field() {
        let (store, repo) = setup();

        let created = repo.create(create_data("Ann", UserStatus::Active)).await.unwrap();
        let patch = UserPatch {
            phone: Some(String::new()),
            ..Default::default()
        };
        let updated = repo.update(&created.id, &patch).await.unwrap();

        assert_eq!(updated.phone, None);
        assert_eq!(store.raw(DEFAULT_COLLECTION, &created.id).unwrap()["phone"], Value::Null);
    }

    #[tokio::test]
    async fn test_update_missing_user_fails() {
        let (_store, repo) = setup();

        let result = repo.update("missing", &UserPatch::default()).await;
        assert!(matches!(result, Err(RepositoryError::RemoteWriteFailed(_))));
    }

    #[tokio::test]
    async fn test_failed_update_leaves_document_unchanged() {
        let (store, repo) = setup();

        let created = repo.create(create_data("Ann", UserStatus::Active)).await.unwrap();
        let before = store.raw(DEFAULT_COLLECTION, &created.id).unwrap();

        store.set_fail_writes(true);
        let patch = UserPatch {
            name: Some("Annie".to_string()),
            ..Default::default()
        };
        assert!(repo.update(&created.id, &patch).await.is_err());

        assert_eq!(store.raw(DEFAULT_COLLECTION, &created.id).unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let (_store, repo) = setup();

        let created = repo.create(create_data("Ann", UserStatus::Active)).await.unwrap();
        repo.delete(&created.id).await.unwrap();

        assert!(repo.get_by_id(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_missing_is_absent_not_error() {
        let (_store, repo) = setup();
        assert!(repo.get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_failures_map_to_unavailable() {
        let (store, repo) = setup();
        store.set_fail_reads(true);

        assert!(matches!(repo.list().await, Err(RepositoryError::RemoteUnavailable(_))));
        assert!(matches!(repo.get_by_id("x").await, Err(RepositoryError::RemoteUnavailable(_))));
        assert!(matches!(repo.search("A").await, Err(RepositoryError::RemoteUnavailable(_))));
    }

    #[tokio::test]
    async fn test_write_failures_map_to_write_failed() {
        let (store, repo) = setup();
        store.set_fail_writes(true);

        let result = repo.create(create_data("Ann", UserStatus::Active)).await;
        assert!(matches!(result, Err(RepositoryError::RemoteWriteFailed(_))));
        assert!(matches!(repo.delete("x").await, Err(RepositoryError::RemoteWriteFailed(_))));
        assert!(store.is_empty(DEFAULT_COLLECTION));
    }

    #[tokio::test]
    async fn test_missing_timestamps_fall_back_to_now() {
        let (store, repo) = setup();
        store.seed(
            DEFAULT_COLLECTION,
            "pending",
            seed_fields(json!({
                "name": "Ann",
                "email": "ann@example.com",
                "status": "active",
                "createdAt": server_timestamp(),
            })),
        );

        let before = Utc::now();
        let user = repo.get_by_id("pending").await.unwrap().unwrap();

        assert!(user.created_at >= before);
        assert!(user.updated_at >= before);
    }

    #[tokio::test]
    async fn test_invalid_documents_are_skipped() {
        let (store, repo) = setup();
        store.seed(
            DEFAULT_COLLECTION,
            "bad-status",
            seed_fields(json!({"name": "Ann", "email": "ann@example.com", "status": "banned"})),
        );
        store.seed(DEFAULT_COLLECTION, "no-email", seed_fields(json!({"name": "Bo", "status": "active"})));
        store.seed(
            DEFAULT_COLLECTION,
            "good",
            seed_fields(json!({"name": "Cy", "email": "cy@example.com", "status": "inactive"})),
        );

        let users = repo.list().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "good");
    }

    #[tokio::test]
    async fn test_search_is_prefix_only() {
        let (_store, repo) = setup();
        for name in ["Ann", "Anna", "Joann", "Bob"] {
            repo.create(create_data(name, UserStatus::Active)).await.unwrap();
        }

        let mut names: Vec<_> = repo.search("Ann").await.unwrap().into_iter().map(|u| u.name).collect();
        names.sort();
        assert_eq!(names, vec!["Ann", "Anna"]);

        assert!(repo.search("nn").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let store = Arc::new(MemoryStore::new());
        let repo = UserRepository::new(store, DEFAULT_COLLECTION).with_search_limit(3);
        for i in 0..5 {
            repo.create(create_data(&format!("User{}", i), UserStatus::Active)).await.unwrap();
        }

        assert_eq!(repo.search("User").await.unwrap().len(), 3);
    }
}
