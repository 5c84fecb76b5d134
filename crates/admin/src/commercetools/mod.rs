//! commercetools GraphQL API client.
//!
//! Provides access to the project's custom objects (user records), reference
//! collections (channels, categories, product selections, stores), products
//! and orders.
//!
//! # Architecture
//!
//! - Client-credentials OAuth; the token is cached in memory and refreshed
//!   shortly before it expires
//! - Hand-written query documents sent through the `graphql_client`
//!   request/response envelope over `reqwest`
//! - Errors are classified by the `extensions.code` the platform attaches to
//!   each GraphQL error
//! - No retries; callers surface failures to the operator

pub mod auth;
pub mod client;
pub mod custom_objects;
pub mod orders;
pub mod products;
pub mod queries;
pub mod references;
pub mod types;

pub use client::CommercetoolsClient;
pub use references::CachedReferences;

use thiserror::Error;

/// Errors that can occur when interacting with the commercetools API.
#[derive(Debug, Error)]
pub enum CommercetoolsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors this client does not classify.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource was modified since the version sent.
    #[error("Concurrent modification (current version: {current_version:?})")]
    ConcurrentModification {
        /// Version the platform holds now, when reported.
        current_version: Option<i64>,
    },

    /// A unique field (e.g. a custom object key) already exists.
    #[error("Duplicate field: {0}")]
    DuplicateField(String),

    /// Rate limited by the platform.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The API rejected the access token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Token request failed (bad client credentials or scopes).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

/// A GraphQL error returned by the commercetools API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// `extensions.code`, when present.
    pub code: Option<String>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| match &e.code {
            Some(code) => format!("{code}: {}", e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
