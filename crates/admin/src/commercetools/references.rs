//! Reference collection loaders: channels, categories, product selections
//! and stores.
//!
//! Each collection is fetched as a single capped page sorted by key. The four
//! loads run concurrently and the resulting [`ReferenceSet`] is cached with
//! `moka` for a configurable TTL.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use tracing::instrument;
use vip_admin_core::resolve::{ReferenceIndex, ReferenceSet};
use vip_admin_core::{PagedResult, ReferenceEntity, ReferenceKind};

use super::CommercetoolsError;
use super::client::CommercetoolsClient;
use super::queries::{FETCH_CATEGORIES, FETCH_CHANNELS, FETCH_PRODUCT_SELECTIONS, FETCH_STORES};
use super::types::ReferencePageData;
use crate::store::{ReferenceSource, StoreError};

const CACHE_KEY: &str = "references";

#[derive(Debug, Serialize)]
struct ReferenceVariables {
    limit: u32,
    sort: Vec<&'static str>,
}

const fn operation(kind: ReferenceKind) -> (&'static str, &'static str) {
    match kind {
        ReferenceKind::Channel => ("FetchChannels", FETCH_CHANNELS),
        ReferenceKind::Category => ("FetchCategories", FETCH_CATEGORIES),
        ReferenceKind::ProductSelection => ("FetchProductSelections", FETCH_PRODUCT_SELECTIONS),
        ReferenceKind::Store => ("FetchStores", FETCH_STORES),
    }
}

impl CommercetoolsClient {
    /// Load one reference collection, capped at [`ReferenceKind::page_cap`].
    ///
    /// # Errors
    ///
    /// Returns `CommercetoolsError` if the API call fails.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn load_references(
        &self,
        kind: ReferenceKind,
    ) -> Result<PagedResult<ReferenceEntity>, CommercetoolsError> {
        let (name, query) = operation(kind);
        let variables = ReferenceVariables {
            limit: kind.page_cap(),
            sort: vec!["key asc"],
        };

        let data: ReferencePageData = self.execute(name, query, variables).await?;
        let page = PagedResult::from(data.page);

        if page.is_truncated() {
            tracing::debug!(
                total = page.total,
                count = page.count,
                "reference collection truncated; missing entries render as raw ids"
            );
        }

        Ok(page)
    }

    /// Load all four collections concurrently. Any failure fails the set.
    ///
    /// # Errors
    ///
    /// Returns the first `CommercetoolsError` from any loader.
    #[instrument(skip(self))]
    pub async fn load_reference_set(&self) -> Result<ReferenceSet, CommercetoolsError> {
        let (channels, categories, product_selections, stores) = tokio::try_join!(
            self.load_references(ReferenceKind::Channel),
            self.load_references(ReferenceKind::Category),
            self.load_references(ReferenceKind::ProductSelection),
            self.load_references(ReferenceKind::Store),
        )?;

        Ok(ReferenceSet {
            channels: ReferenceIndex::new(channels),
            categories: ReferenceIndex::new(categories),
            product_selections: ReferenceIndex::new(product_selections),
            stores: ReferenceIndex::new(stores),
        })
    }
}

/// Reference set loaded from the platform and cached for a TTL.
#[derive(Clone)]
pub struct CachedReferences {
    client: CommercetoolsClient,
    cache: Cache<&'static str, Arc<ReferenceSet>>,
}

impl std::fmt::Debug for CachedReferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedReferences")
            .field("client", &self.client)
            .field("cached", &self.cache.contains_key(CACHE_KEY))
            .finish()
    }
}

impl CachedReferences {
    #[must_use]
    pub fn new(client: CommercetoolsClient, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { client, cache }
    }

    /// Drop the cached set so the next request reloads it.
    pub async fn invalidate(&self) {
        self.cache.invalidate(CACHE_KEY).await;
    }
}

impl ReferenceSource for CachedReferences {
    async fn reference_set(&self) -> Result<Arc<ReferenceSet>, StoreError> {
        load_once(&self.cache, self.client.load_reference_set()).await
    }
}

/// The cached set, or the result of `load` on a miss.
///
/// Concurrent callers on a cold cache wait on a single load. Failures are not
/// cached; every waiter gets the error.
async fn load_once<F>(
    cache: &Cache<&'static str, Arc<ReferenceSet>>,
    load: F,
) -> Result<Arc<ReferenceSet>, StoreError>
where
    F: Future<Output = Result<ReferenceSet, CommercetoolsError>>,
{
    cache
        .try_get_with(CACHE_KEY, async {
            let set = load.await?;
            tracing::debug!(
                channels = set.channels.len(),
                categories = set.categories.len(),
                product_selections = set.product_selections.len(),
                stores = set.stores.len(),
                "loaded reference data"
            );
            Ok::<_, CommercetoolsError>(Arc::new(set))
        })
        .await
        .map_err(|shared| {
            Arc::try_unwrap(shared).map_or_else(StoreError::SharedBackend, StoreError::from)
        })
}
