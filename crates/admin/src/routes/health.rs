//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Loads the reference collections, which needs a working platform token.
/// Returns 503 Service Unavailable if they cannot be loaded.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.users().references().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
