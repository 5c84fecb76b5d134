//! VIP Admin library.
//!
//! Back-office for the commercetools project behind the VIP storefronts:
//! application users kept as custom objects, and read-only product and
//! order screens scoped to the signed-in user.
//!
//! The binary in `main.rs` adds Sentry and serves [`app`]; tests drive the
//! same router in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::{Router, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

pub mod commercetools;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use state::AppState;

/// The application router with health checks and request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/health/ready", get(routes::health::readiness))
        .merge(routes::routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
