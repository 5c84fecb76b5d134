//! Application state shared across handlers.

use std::sync::Arc;

use thiserror::Error;
use vip_admin_core::projection::UserDraft;
use vip_admin_core::query::UserQuery;
use vip_admin_core::resolve::ReferenceSet;
use vip_admin_core::{CustomObjectId, DisplayConfig, PagedResult, StoredUser, UserKey};

use crate::commercetools::{CachedReferences, CommercetoolsClient, CommercetoolsError};
use crate::config::{AdminConfig, ConfigError, StoreBackend};
use crate::error::AppError;
use crate::services::UserDirectory;
use crate::store::{InMemoryUserStore, ReferenceSource, StaticReferences, StoreError, UserStore};

/// The user directory as wired for this process.
pub type Directory = UserDirectory<UserBackend, ReferenceBackend>;

/// Errors building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to create commercetools client: {0}")]
    Client(#[from] CommercetoolsError),
}

/// User store selected by `ADMIN_STORE`.
#[derive(Debug, Clone)]
pub enum UserBackend {
    Commercetools(CommercetoolsClient),
    Memory(InMemoryUserStore),
}

impl UserStore for UserBackend {
    async fn query_users(&self, query: &UserQuery) -> Result<PagedResult<StoredUser>, StoreError> {
        match self {
            Self::Commercetools(client) => client.query_users(query).await,
            Self::Memory(store) => store.query_users(query).await,
        }
    }

    async fn get_user(
        &self,
        container: &str,
        id: &CustomObjectId,
    ) -> Result<Option<StoredUser>, StoreError> {
        match self {
            Self::Commercetools(client) => client.get_user(container, id).await,
            Self::Memory(store) => store.get_user(container, id).await,
        }
    }

    async fn get_user_by_key(
        &self,
        container: &str,
        key: &UserKey,
    ) -> Result<Option<StoredUser>, StoreError> {
        match self {
            Self::Commercetools(client) => client.get_user_by_key(container, key).await,
            Self::Memory(store) => store.get_user_by_key(container, key).await,
        }
    }

    async fn save_user(&self, container: &str, draft: &UserDraft) -> Result<StoredUser, StoreError> {
        match self {
            Self::Commercetools(client) => client.save_user(container, draft).await,
            Self::Memory(store) => store.save_user(container, draft).await,
        }
    }
}

/// Reference source matching the user backend.
#[derive(Debug, Clone)]
pub enum ReferenceBackend {
    Cached(CachedReferences),
    Static(StaticReferences),
}

impl ReferenceSource for ReferenceBackend {
    async fn reference_set(&self) -> Result<Arc<ReferenceSet>, StoreError> {
        match self {
            Self::Cached(references) => references.reference_set().await,
            Self::Static(references) => references.reference_set().await,
        }
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    users: Directory,
    commercetools: Option<CommercetoolsClient>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.inner.config.store)
            .field("container", &self.inner.config.users_container)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build the state for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the commercetools backend is selected without
    /// its configuration or the client cannot be created.
    pub fn new(config: AdminConfig) -> Result<Self, StateError> {
        match config.store {
            StoreBackend::Commercetools => {
                let ct_config = config
                    .commercetools
                    .clone()
                    .ok_or_else(|| ConfigError::MissingEnvVar("CTP_PROJECT_KEY".to_string()))?;
                let client = CommercetoolsClient::new(ct_config)?;
                let references = CachedReferences::new(client.clone(), config.reference_ttl);
                tracing::info!(project = client.project_key(), "using commercetools user store");

                Ok(Self::build(
                    config,
                    UserBackend::Commercetools(client.clone()),
                    ReferenceBackend::Cached(references),
                    Some(client),
                ))
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory user store; data is lost on restart");
                Ok(Self::in_memory(
                    config,
                    InMemoryUserStore::new(),
                    ReferenceSet::default(),
                ))
            }
        }
    }

    /// State over an in-memory store and a fixed reference set. Product and
    /// order screens are unavailable.
    #[must_use]
    pub fn in_memory(config: AdminConfig, store: InMemoryUserStore, references: ReferenceSet) -> Self {
        Self::build(
            config,
            UserBackend::Memory(store),
            ReferenceBackend::Static(StaticReferences::new(references)),
            None,
        )
    }

    fn build(
        config: AdminConfig,
        store: UserBackend,
        references: ReferenceBackend,
        commercetools: Option<CommercetoolsClient>,
    ) -> Self {
        let users = UserDirectory::new(
            store,
            references,
            config.users_container.clone(),
            config.identity_scheme,
            DisplayConfig::new(config.data_locale.clone()),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                users,
                commercetools,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn users(&self) -> &Directory {
        &self.inner.users
    }

    #[must_use]
    pub fn display(&self) -> &DisplayConfig {
        self.inner.users.display()
    }

    /// The platform client, for product and order screens.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unavailable` when running on the in-memory store.
    pub fn commercetools(&self) -> Result<&CommercetoolsClient, AppError> {
        self.inner.commercetools.as_ref().ok_or_else(|| {
            AppError::Unavailable("commercetools is not configured (ADMIN_STORE=memory)".to_string())
        })
    }
}
