//! VIP Admin Core - Shared types and the user enrichment pipeline.
//!
//! This crate provides the types and pure logic used by the other VIP Admin
//! components:
//! - `admin` - commercetools client, user directory service and admin server
//! - `cli` - Command-line tools for operators
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no HTTP clients,
//! no storage access. Everything here can be tested without a network.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, localized strings, user records
//! - [`resolve`] - Label resolution of user id lists against reference data
//! - [`query`] - Filter/paginate state and query predicate construction
//! - [`listing`] - Search debouncing and stale-response guarding
//! - [`projection`] - Table rows and edit-form mapping
//! - [`editing`] - Per-row edit session state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod editing;
pub mod listing;
pub mod projection;
pub mod query;
pub mod resolve;
pub mod types;

pub use types::*;

/// Display settings passed explicitly to the resolver and row projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Locale used to pick localized names (e.g. `es`).
    pub locale: String,
    /// Text shown for empty cells.
    pub placeholder: String,
}

impl DisplayConfig {
    /// Create a display config for a locale with the default placeholder.
    #[must_use]
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            placeholder: "-".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::new("es")
    }
}
