//! Integration tests for VIP Admin.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process router tests (in-memory store, no network)
//! cargo test -p vip-admin-integration-tests
//!
//! # Tests against a running admin (ADMIN_BASE_URL, default http://localhost:3001)
//! cargo test -p vip-admin-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `admin_router` - Full router over the in-memory store
//! - `admin_users` - User screens of a running admin server

use axum::Router;
use vip_admin::config::AdminConfig;
use vip_admin::state::AppState;
use vip_admin::store::InMemoryUserStore;
use vip_admin_core::ReferenceEntity;
use vip_admin_core::resolve::{ReferenceIndex, ReferenceSet};

/// Container used by the in-memory fixtures.
pub const CONTAINER: &str = "app-users";

/// Header the proxy sets with the signed-in user's platform id.
pub const USER_ID: &str = "mc-user-1";

/// Reference collections for router tests.
#[must_use]
pub fn references() -> ReferenceSet {
    ReferenceSet {
        channels: ReferenceIndex::from_entities(vec![
            ReferenceEntity::new("c1").with_name("es", "Bar Norte"),
        ]),
        categories: ReferenceIndex::from_entities(vec![
            ReferenceEntity::new("cat1").with_name("es", "Bebidas"),
        ]),
        product_selections: ReferenceIndex::from_entities(vec![
            ReferenceEntity::new("ps1").with_name("es", "Zona VIP"),
        ]),
        stores: ReferenceIndex::from_entities(vec![
            ReferenceEntity::new("s1").with_key("madrid").with_name("es", "Madrid"),
        ]),
    }
}

/// The full router over an in-memory store, plus a handle on the store.
#[must_use]
pub fn memory_app() -> (Router, InMemoryUserStore) {
    let store = InMemoryUserStore::new();
    let state = AppState::in_memory(AdminConfig::in_memory(), store.clone(), references());
    (vip_admin::app(state), store)
}

/// Base URL of a running admin server.
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}
