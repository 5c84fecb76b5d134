//! User directory: lists, loads and saves application users.
//!
//! Sits between the HTTP handlers and the storage seams. Every list joins
//! one page of user records with the reference collections and projects the
//! result into display rows.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;
use vip_admin_core::projection::{
    UserDraft, UserFormValues, UserRow, ValidationErrors, form_values_to_user,
    project_stored_user, validate,
};
use vip_admin_core::query::{UserListState, UserQuery, total_pages};
use vip_admin_core::resolve::ReferenceSet;
use vip_admin_core::{
    CategoryId, ChannelId, CustomObjectId, DisplayConfig, IdentityScheme, ProductSelectionId,
    StoredUser, UserIdentity, UserKey, UserRecord, UserValueError,
};

use crate::store::{ReferenceSource, StoreError, UserStore};

/// Errors from user directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The submitted form has field errors; nothing was sent to the store.
    #[error("invalid user: {0}")]
    Invalid(#[from] ValidationErrors),

    /// The record was changed by someone else since it was loaded.
    #[error("user {key} was modified elsewhere; reload and retry")]
    Conflict { key: UserKey },

    /// A new user would take the key of an existing record.
    #[error("a user with key {key} already exists")]
    Duplicate { key: UserKey },

    /// No such user.
    #[error("user not found: {0}")]
    NotFound(String),

    /// The stored value cannot be decoded.
    #[error("user {id} has an unreadable value: {source}")]
    Malformed {
        id: CustomObjectId,
        source: UserValueError,
    },

    /// Store or transport failure.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { key, .. } => Self::Conflict { key },
            StoreError::Duplicate(key) => Self::Duplicate { key },
            StoreError::NotFound(what) => Self::NotFound(what),
            other => Self::Store(other),
        }
    }
}

/// One page of the user table.
#[derive(Debug, Clone)]
pub struct UserPage {
    pub rows: Vec<UserRow>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
}

/// The id lists a user is scoped to on the product screens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserScope {
    pub provider_ids: Vec<ChannelId>,
    pub category_ids: Vec<CategoryId>,
    pub product_selection_ids: Vec<ProductSelectionId>,
    pub element_type_ids: Vec<String>,
}

impl UserScope {
    fn from_record(record: &UserRecord) -> Self {
        let value = &record.value;
        Self {
            provider_ids: value.provider_ids.iter().map(|id| ChannelId::new(id.clone())).collect(),
            category_ids: value.category_ids.iter().map(|id| CategoryId::new(id.clone())).collect(),
            product_selection_ids: value
                .product_selection_ids
                .iter()
                .map(|id| ProductSelectionId::new(id.clone()))
                .collect(),
            element_type_ids: value.element_type_ids.clone(),
        }
    }

    /// Provider key preselected on the products-by-provider screen.
    #[must_use]
    pub fn default_provider_key(&self) -> Option<&str> {
        self.element_type_ids.first().map(String::as_str)
    }
}

/// User directory over a user store and a reference source.
#[derive(Debug, Clone)]
pub struct UserDirectory<S, R> {
    store: S,
    references: R,
    container: String,
    scheme: IdentityScheme,
    display: DisplayConfig,
}

impl<S, R> UserDirectory<S, R>
where
    S: UserStore,
    R: ReferenceSource,
{
    pub fn new(
        store: S,
        references: R,
        container: impl Into<String>,
        scheme: IdentityScheme,
        display: DisplayConfig,
    ) -> Self {
        Self {
            store,
            references,
            container: container.into(),
            scheme,
            display,
        }
    }

    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Scheme new records are keyed under.
    #[must_use]
    pub const fn scheme(&self) -> IdentityScheme {
        self.scheme
    }

    #[must_use]
    pub const fn display(&self) -> &DisplayConfig {
        &self.display
    }

    /// The loaded reference collections, for form option lists.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Store` if any collection fails to load.
    pub async fn references(&self) -> Result<Arc<ReferenceSet>, DirectoryError> {
        Ok(self.references.reference_set().await?)
    }

    /// One page of users as display rows.
    ///
    /// The user query and the reference loads run concurrently; rows are
    /// built only once both have completed.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Store` if the query or any reference load
    /// fails.
    pub async fn list(&self, state: &UserListState) -> Result<UserPage, DirectoryError> {
        self.list_query(&state.to_query(&self.container)).await
    }

    /// One page of users for an already built query.
    ///
    /// # Errors
    ///
    /// See [`Self::list`].
    #[instrument(skip(self, query), fields(offset = query.offset, limit = query.limit))]
    pub async fn list_query(&self, query: &UserQuery) -> Result<UserPage, DirectoryError> {
        let (page, references) = tokio::try_join!(
            self.store.query_users(query),
            self.references.reference_set(),
        )?;

        let rows = page
            .results
            .iter()
            .map(|stored| project_stored_user(stored, &references, &self.display))
            .collect();

        let per_page = query.limit.max(1);
        Ok(UserPage {
            rows,
            total: page.total,
            page: query.offset / per_page + 1,
            per_page,
            total_pages: total_pages(page.total, per_page),
        })
    }

    /// A user by custom object id.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Malformed` if the stored value cannot be
    /// decoded, `DirectoryError::Store` on store failures.
    #[instrument(skip(self))]
    pub async fn find(&self, id: &CustomObjectId) -> Result<Option<UserRecord>, DirectoryError> {
        self.store
            .get_user(&self.container, id)
            .await?
            .map(|stored| decode(&stored))
            .transpose()
    }

    /// The user record of a signed-in platform user.
    ///
    /// Looks up the key under the configured scheme first. On a miss, retries
    /// with the key under the other scheme and logs a warning naming both
    /// keys so the record can be re-keyed.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Malformed` if the stored value cannot be
    /// decoded, `DirectoryError::Store` on store failures.
    #[instrument(skip(self, identity))]
    pub async fn find_by_identity(
        &self,
        identity: &UserIdentity,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let primary = identity.key(self.scheme);

        if let Some(key) = &primary
            && let Some(stored) = self.store.get_user_by_key(&self.container, key).await?
        {
            return decode(&stored).map(Some);
        }

        let Some(legacy) = identity.fallback_key(self.scheme) else {
            return Ok(None);
        };
        let Some(stored) = self.store.get_user_by_key(&self.container, &legacy).await? else {
            return Ok(None);
        };

        tracing::warn!(
            expected_key = primary.as_ref().map(UserKey::as_str),
            legacy_key = %legacy,
            "user record found under legacy key; re-key it to the canonical scheme"
        );
        decode(&stored).map(Some)
    }

    /// The scope of the signed-in user; `None` if they have no record.
    ///
    /// # Errors
    ///
    /// See [`Self::find_by_identity`].
    pub async fn scope_for(&self, identity: &UserIdentity) -> Result<Option<UserScope>, DirectoryError> {
        Ok(self
            .find_by_identity(identity)
            .await?
            .as_ref()
            .map(UserScope::from_record))
    }

    /// Validate form values and save them.
    ///
    /// `existing` is the record being edited, carrying the version the
    /// operator loaded; `None` creates a new user keyed under the configured
    /// scheme, so that [`Self::find_by_identity`] finds it.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Invalid` without touching the store when
    /// validation fails, `DirectoryError::Conflict` when `existing` is stale,
    /// `DirectoryError::Duplicate` when a new user's key is taken.
    #[instrument(skip(self, values, existing), fields(key = existing.map(|r| r.key.as_str())))]
    pub async fn save(
        &self,
        values: &UserFormValues,
        existing: Option<&UserRecord>,
    ) -> Result<UserRecord, DirectoryError> {
        validate(values)?;
        let draft = form_values_to_user(values, existing, self.scheme, Utc::now());
        self.save_draft(&draft).await
    }

    /// Create a user from form values.
    ///
    /// # Errors
    ///
    /// See [`Self::save`].
    pub async fn create(&self, values: &UserFormValues) -> Result<UserRecord, DirectoryError> {
        self.save(values, None).await
    }

    /// Update a user from form values, expecting `version` to be current.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::NotFound` if the user does not exist; see
    /// also [`Self::save`].
    pub async fn update(
        &self,
        id: &CustomObjectId,
        version: i64,
        values: &UserFormValues,
    ) -> Result<UserRecord, DirectoryError> {
        validate(values)?;
        let mut record = self
            .find(id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))?;
        record.version = version;
        self.save(values, Some(&record)).await
    }

    /// Activate or deactivate a user. Users are never deleted.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::NotFound` if the user does not exist,
    /// `DirectoryError::Conflict` if `version` is stale.
    #[instrument(skip(self))]
    pub async fn set_active(
        &self,
        id: &CustomObjectId,
        version: i64,
        active: bool,
    ) -> Result<UserRecord, DirectoryError> {
        let record = self
            .find(id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))?;

        let mut value = record.value;
        value.active = active;
        value.updated_at = Some(Utc::now());

        let draft = UserDraft {
            key: record.key,
            version: Some(version),
            value,
        };
        self.save_draft(&draft).await
    }

    /// Write a draft that has already been validated.
    ///
    /// A draft without a version would overwrite any record under its key,
    /// so new drafts are checked against the store first.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Conflict` if the draft's version is stale,
    /// `DirectoryError::Duplicate` if a new draft's key is taken.
    pub async fn save_draft(&self, draft: &UserDraft) -> Result<UserRecord, DirectoryError> {
        if draft.is_new()
            && self
                .store
                .get_user_by_key(&self.container, &draft.key)
                .await?
                .is_some()
        {
            return Err(DirectoryError::Duplicate {
                key: draft.key.clone(),
            });
        }

        let stored = self.store.save_user(&self.container, draft).await?;
        tracing::info!(key = %stored.key, version = stored.version, created = draft.is_new(), "user saved");
        decode(&stored)
    }
}

fn decode(stored: &StoredUser) -> Result<UserRecord, DirectoryError> {
    stored.parse().map_err(|source| DirectoryError::Malformed {
        id: stored.id.clone(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use vip_admin_core::query::{RoleFilter, StatusFilter};
    use vip_admin_core::resolve::ReferenceIndex;
    use vip_admin_core::{Email, ReferenceEntity, Role};

    use super::*;
    use crate::commercetools::CommercetoolsError;
    use crate::store::{InMemoryUserStore, StaticReferences};

    const CONTAINER: &str = "app-users";

    fn references() -> ReferenceSet {
        ReferenceSet {
            channels: ReferenceIndex::from_entities(vec![
                ReferenceEntity::new("c1").with_name("es", "Store A"),
            ]),
            categories: ReferenceIndex::from_entities(vec![
                ReferenceEntity::new("cat1")
                    .with_name("es", "Ropa")
                    .with_name("en", "Clothes"),
            ]),
            ..ReferenceSet::default()
        }
    }

    fn directory(
        store: InMemoryUserStore,
        scheme: IdentityScheme,
    ) -> UserDirectory<InMemoryUserStore, StaticReferences> {
        UserDirectory::new(
            store,
            StaticReferences::new(references()),
            CONTAINER,
            scheme,
            DisplayConfig::default(),
        )
    }

    fn values(email: &str) -> UserFormValues {
        UserFormValues {
            email: email.to_string(),
            name: "Ana".to_string(),
            provider_ids: vec!["c1".to_string(), "c2".to_string()],
            category_ids: vec!["cat1".to_string()],
            product_selection_ids: vec!["ps1".to_string()],
            element_type_ids: vec!["vip".to_string()],
            ..UserFormValues::default()
        }
    }

    #[tokio::test]
    async fn test_list_resolves_labels() {
        let directory = directory(InMemoryUserStore::new(), IdentityScheme::PlatformId);
        directory.create(&values("ana@example.com")).await.unwrap();

        let page = directory.list(&UserListState::new()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.total_pages, 1);
        let row = &page.rows[0];
        assert_eq!(row.providers, "Store A, c2");
        assert_eq!(row.categories, "Ropa");
        assert_eq!(row.element_types, "Servicios VIP");
    }

    #[tokio::test]
    async fn test_list_reports_page_of_query() {
        let directory = directory(InMemoryUserStore::new(), IdentityScheme::EmailKey);
        for email in ["a@example.com", "b@example.com", "c@example.com"] {
            directory.create(&values(email)).await.unwrap();
        }

        let mut state = UserListState::new();
        state.set_per_page(10);
        state.set_page(1);
        let page = directory.list(&state).await.unwrap();
        assert_eq!((page.page, page.per_page, page.total_pages), (1, 10, 1));
        assert_eq!(page.rows.len(), 3);

        let mut query = state.to_query(CONTAINER);
        query.limit = 2;
        query.offset = 2;
        let page = directory.list_query(&query).await.unwrap();
        assert_eq!((page.page, page.per_page, page.total_pages), (2, 2, 2));
        assert_eq!(page.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_list_renders_malformed_record_as_placeholder() {
        let store = InMemoryUserStore::new();
        store
            .insert_raw(
                CONTAINER,
                StoredUser {
                    id: CustomObjectId::new("bad"),
                    key: UserKey::new("user-bad"),
                    version: 1,
                    value: json!(42),
                },
            )
            .await;
        let directory = directory(store, IdentityScheme::PlatformId);

        let page = directory.list(&UserListState::new()).await.unwrap();
        assert_eq!(page.rows.len(), 1);
        assert!(page.rows[0].malformed);
        assert_eq!(page.rows[0].key, "user-bad");
    }

    #[tokio::test]
    async fn test_list_filters() {
        let directory = directory(InMemoryUserStore::new(), IdentityScheme::PlatformId);
        directory.create(&values("ana@example.com")).await.unwrap();
        let mut admin = values("bea@example.com");
        admin.roles = vec![Role::ADMIN.to_string()];
        admin.active = false;
        directory.create(&admin).await.unwrap();

        let mut state = UserListState::new();
        state.set_role(RoleFilter::Role(Role::admin()));
        let page = directory.list(&state).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].email, "bea@example.com");

        state.set_role(RoleFilter::All);
        state.set_status(StatusFilter::Active);
        let page = directory.list(&state).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].email, "ana@example.com");
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_store() {
        let store = InMemoryUserStore::new();
        let directory = directory(store.clone(), IdentityScheme::PlatformId);

        let mut invalid = values("not-an-email");
        invalid.provider_ids.clear();
        let err = directory.create(&invalid).await.unwrap_err();

        let DirectoryError::Invalid(errors) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(store.len(CONTAINER).await, 0);
    }

    #[tokio::test]
    async fn test_stale_update_is_conflict() {
        let directory = directory(InMemoryUserStore::new(), IdentityScheme::PlatformId);
        let created = directory.create(&values("ana@example.com")).await.unwrap();

        let mut first = values("ana@example.com");
        first.name = "Ana First".to_string();
        directory
            .update(&created.id, created.version, &first)
            .await
            .unwrap();

        let mut second = values("ana@example.com");
        second.name = "Ana Second".to_string();
        let err = directory
            .update(&created.id, created.version, &second)
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Conflict { .. }));

        let current = directory.find(&created.id).await.unwrap().unwrap();
        assert_eq!(current.value.name, "Ana First");
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let directory = directory(InMemoryUserStore::new(), IdentityScheme::PlatformId);
        let err = directory
            .update(&CustomObjectId::new("nope"), 1, &values("ana@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_set_active_refreshes_updated_at() {
        let directory = directory(InMemoryUserStore::new(), IdentityScheme::PlatformId);
        let created = directory.create(&values("ana@example.com")).await.unwrap();

        let deactivated = directory
            .set_active(&created.id, created.version, false)
            .await
            .unwrap();
        assert!(!deactivated.value.active);
        assert_eq!(deactivated.version, created.version + 1);
        assert_eq!(deactivated.value.created_at, created.value.created_at);
        assert!(deactivated.value.updated_at >= created.value.updated_at);

        let stale = directory.set_active(&created.id, created.version, true).await;
        assert!(matches!(stale, Err(DirectoryError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_find_by_identity_falls_back_to_legacy_key() {
        let store = InMemoryUserStore::new();
        let email = Email::parse("Ana@Example.com").unwrap();
        let draft = form_values_to_user(
            &values("ana@example.com"),
            None,
            IdentityScheme::PlatformId,
            Utc::now(),
        );
        let legacy = UserDraft {
            key: UserKey::from_email(&email),
            ..draft
        };
        store.save_user(CONTAINER, &legacy).await.unwrap();

        let directory = directory(store, IdentityScheme::PlatformId);
        let identity = UserIdentity {
            user_id: Some("platform-user-1".to_string()),
            email: Some(email),
        };

        let found = directory.find_by_identity(&identity).await.unwrap().unwrap();
        assert_eq!(found.key.as_str(), "ana~example.com");

        let scope = directory.scope_for(&identity).await.unwrap().unwrap();
        assert_eq!(scope.category_ids, vec![CategoryId::new("cat1")]);
        assert_eq!(scope.default_provider_key(), Some("vip"));
    }

    #[test]
    fn test_default_provider_is_first_element_type() {
        let scope = UserScope {
            provider_ids: Vec::new(),
            category_ids: Vec::new(),
            product_selection_ids: Vec::new(),
            element_type_ids: vec!["vip".to_string(), "partner".to_string()],
        };
        assert_eq!(scope.default_provider_key(), Some("vip"));

        let empty = UserScope {
            element_type_ids: Vec::new(),
            ..scope
        };
        assert_eq!(empty.default_provider_key(), None);
    }

    fn signed_in(email: &str) -> UserIdentity {
        UserIdentity {
            user_id: Some("platform-user-1".to_string()),
            email: Email::parse(email).ok(),
        }
    }

    #[tokio::test]
    async fn test_created_user_is_found_by_identity() {
        for scheme in [IdentityScheme::EmailKey, IdentityScheme::PlatformId] {
            let directory = directory(InMemoryUserStore::new(), scheme);
            let created = directory.create(&values("Ana@Example.com")).await.unwrap();
            assert_eq!(created.key.as_str(), "ana~example.com");

            let found = directory
                .find_by_identity(&signed_in("ana@example.com"))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(found.id, created.id);

            let scope = directory
                .scope_for(&signed_in("ana@example.com"))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(scope.category_ids, vec![CategoryId::new("cat1")]);
        }
    }

    #[tokio::test]
    async fn test_created_user_keyed_by_platform_id() {
        let directory = directory(InMemoryUserStore::new(), IdentityScheme::PlatformId);
        let mut form = values("ana@example.com");
        form.platform_user_id = "platform-user-1".to_string();
        let created = directory.create(&form).await.unwrap();
        assert_eq!(created.key.as_str(), "platform-user-1");

        let found = directory
            .find_by_identity(&signed_in("someone-else@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn test_create_with_taken_key_is_duplicate() {
        let store = InMemoryUserStore::new();
        let directory = directory(store.clone(), IdentityScheme::EmailKey);
        directory.create(&values("ana@example.com")).await.unwrap();

        let mut again = values("ana@example.com");
        again.name = "Impostor".to_string();
        let err = directory.create(&again).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Duplicate { key } if key.as_str() == "ana~example.com"));

        assert_eq!(store.len(CONTAINER).await, 1);
        let kept = directory
            .find_by_identity(&signed_in("ana@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.value.name, "Ana");
        assert_eq!(kept.version, 1);
    }

    /// Reference source whose loads always fail.
    #[derive(Debug, Clone)]
    struct UnavailableReferences;

    impl ReferenceSource for UnavailableReferences {
        async fn reference_set(&self) -> Result<Arc<ReferenceSet>, StoreError> {
            Err(StoreError::Backend(CommercetoolsError::RateLimited(30)))
        }
    }

    #[tokio::test]
    async fn test_list_fails_when_references_fail() {
        let store = InMemoryUserStore::new();
        directory(store.clone(), IdentityScheme::EmailKey)
            .create(&values("ana@example.com"))
            .await
            .unwrap();

        let directory = UserDirectory::new(
            store,
            UnavailableReferences,
            CONTAINER,
            IdentityScheme::EmailKey,
            DisplayConfig::default(),
        );
        let result = directory.list(&UserListState::new()).await;
        let Err(err) = result else {
            panic!("expected the list to fail without reference data");
        };
        assert!(matches!(
            err,
            DirectoryError::Store(StoreError::Backend(CommercetoolsError::RateLimited(30)))
        ));
        assert!(matches!(
            directory.references().await,
            Err(DirectoryError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_find_by_identity_without_record() {
        let directory = directory(InMemoryUserStore::new(), IdentityScheme::PlatformId);
        let identity = UserIdentity {
            user_id: Some("platform-user-1".to_string()),
            email: None,
        };
        assert!(directory.find_by_identity(&identity).await.unwrap().is_none());
        assert!(directory.scope_for(&identity).await.unwrap().is_none());
    }
}
