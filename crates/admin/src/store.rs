//! Storage seams for user records and reference data.
//!
//! The admin reads and writes users through [`UserStore`] and loads
//! reference collections through [`ReferenceSource`]. The commercetools
//! client implements both against the platform; the in-memory versions back
//! tests and local development (`ADMIN_STORE=memory`).

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use vip_admin_core::projection::UserDraft;
use vip_admin_core::query::{SortDirection, UserQuery};
use vip_admin_core::resolve::ReferenceSet;
use vip_admin_core::{CustomObjectId, PagedResult, StoredUser, UserKey};

use crate::commercetools::CommercetoolsError;

/// Errors from a user store or reference source.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with the given id or key.
    #[error("not found: {0}")]
    NotFound(String),

    /// The record changed since it was read.
    #[error("user {key} was modified concurrently (expected version {expected:?}, current {current:?})")]
    Conflict {
        key: UserKey,
        expected: Option<i64>,
        current: Option<i64>,
    },

    /// A record with the same key already exists.
    #[error("user {0} already exists")]
    Duplicate(UserKey),

    /// The draft value could not be encoded.
    #[error("failed to encode user value: {0}")]
    Encode(#[from] serde_json::Error),

    /// The backend returned something the store cannot use.
    #[error("unexpected store response: {0}")]
    Unexpected(String),

    /// Transport or platform failure.
    #[error("commercetools error: {0}")]
    Backend(CommercetoolsError),

    /// A platform failure shared by every caller waiting on the same load.
    #[error("commercetools error: {0}")]
    SharedBackend(Arc<CommercetoolsError>),
}

impl StoreError {
    /// Whether the caller should reload and retry.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Read and write access to user custom objects.
pub trait UserStore: Send + Sync {
    /// One page of users matching the query.
    fn query_users(
        &self,
        query: &UserQuery,
    ) -> impl Future<Output = Result<PagedResult<StoredUser>, StoreError>> + Send;

    /// A user by custom object id; `None` when absent.
    fn get_user(
        &self,
        container: &str,
        id: &CustomObjectId,
    ) -> impl Future<Output = Result<Option<StoredUser>, StoreError>> + Send;

    /// A user by key; `None` when absent.
    fn get_user_by_key(
        &self,
        container: &str,
        key: &UserKey,
    ) -> impl Future<Output = Result<Option<StoredUser>, StoreError>> + Send;

    /// Create or update a user.
    ///
    /// Without a version the record is created, or overwritten if the key
    /// exists. With a version the stored record must carry exactly that
    /// version, otherwise [`StoreError::Conflict`] is returned and nothing is
    /// written.
    fn save_user(
        &self,
        container: &str,
        draft: &UserDraft,
    ) -> impl Future<Output = Result<StoredUser, StoreError>> + Send;
}

/// Provider of the loaded reference collections.
pub trait ReferenceSource: Send + Sync {
    /// All four collections. Fails as a whole if any collection fails.
    fn reference_set(&self) -> impl Future<Output = Result<Arc<ReferenceSet>, StoreError>> + Send;
}

// =============================================================================
// In-memory implementations
// =============================================================================

/// User store held in process memory.
///
/// Values are stored as JSON-encoded strings, the same shape the platform
/// returns for values written by the admin.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    containers: Arc<RwLock<HashMap<String, BTreeMap<UserKey, StoredUser>>>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing version checks.
    pub async fn insert_raw(&self, container: &str, user: StoredUser) {
        self.containers
            .write()
            .await
            .entry(container.to_string())
            .or_default()
            .insert(user.key.clone(), user);
    }

    /// Number of records in a container.
    pub async fn len(&self, container: &str) -> usize {
        self.containers
            .read()
            .await
            .get(container)
            .map_or(0, BTreeMap::len)
    }
}

impl UserStore for InMemoryUserStore {
    async fn query_users(&self, query: &UserQuery) -> Result<PagedResult<StoredUser>, StoreError> {
        let containers = self.containers.read().await;
        let Some(records) = containers.get(&query.container) else {
            return Ok(PagedResult::empty());
        };

        let mut matching: Vec<&StoredUser> = records
            .values()
            .filter(|stored| {
                query.predicate.is_empty()
                    || stored
                        .parse()
                        .is_ok_and(|record| query.predicate.matches(&record.key, &record.value))
            })
            .collect();

        // Records are keyed by `UserKey`, so iteration is already `key asc`.
        let descending = query
            .sort
            .first()
            .is_some_and(|sort| sort.field == "key" && sort.direction == SortDirection::Desc);
        if descending {
            matching.reverse();
        }

        let total = matching.len() as u64;
        let results: Vec<StoredUser> = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(PagedResult {
            total,
            count: results.len() as u64,
            offset: u64::from(query.offset),
            results,
        })
    }

    async fn get_user(
        &self,
        container: &str,
        id: &CustomObjectId,
    ) -> Result<Option<StoredUser>, StoreError> {
        Ok(self
            .containers
            .read()
            .await
            .get(container)
            .and_then(|records| records.values().find(|stored| &stored.id == id))
            .cloned())
    }

    async fn get_user_by_key(
        &self,
        container: &str,
        key: &UserKey,
    ) -> Result<Option<StoredUser>, StoreError> {
        Ok(self
            .containers
            .read()
            .await
            .get(container)
            .and_then(|records| records.get(key))
            .cloned())
    }

    async fn save_user(&self, container: &str, draft: &UserDraft) -> Result<StoredUser, StoreError> {
        let value = Value::String(draft.value.to_wire()?);

        let mut containers = self.containers.write().await;
        let records = containers.entry(container.to_string()).or_default();
        let existing = records.get(&draft.key);

        let saved = match (draft.version, existing) {
            (None, None) => StoredUser {
                id: CustomObjectId::new(uuid::Uuid::new_v4().to_string()),
                key: draft.key.clone(),
                version: 1,
                value,
            },
            (None, Some(current)) => StoredUser {
                id: current.id.clone(),
                key: draft.key.clone(),
                version: current.version + 1,
                value,
            },
            (Some(_), None) => return Err(StoreError::NotFound(draft.key.to_string())),
            (Some(expected), Some(current)) if expected != current.version => {
                return Err(StoreError::Conflict {
                    key: draft.key.clone(),
                    expected: Some(expected),
                    current: Some(current.version),
                });
            }
            (Some(_), Some(current)) => StoredUser {
                id: current.id.clone(),
                key: draft.key.clone(),
                version: current.version + 1,
                value,
            },
        };

        records.insert(saved.key.clone(), saved.clone());
        tracing::debug!(key = %saved.key, version = saved.version, "saved user in memory");
        Ok(saved)
    }
}

/// A fixed reference set.
#[derive(Debug, Clone, Default)]
pub struct StaticReferences {
    set: Arc<ReferenceSet>,
}

impl StaticReferences {
    #[must_use]
    pub fn new(set: ReferenceSet) -> Self {
        Self { set: Arc::new(set) }
    }
}

impl ReferenceSource for StaticReferences {
    async fn reference_set(&self) -> Result<Arc<ReferenceSet>, StoreError> {
        Ok(Arc::clone(&self.set))
    }
}
