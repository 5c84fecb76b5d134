//! Unified error handling for admin.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::commercetools::CommercetoolsError;
use crate::services::DirectoryError;
use crate::store::StoreError;

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// User directory operation failed.
    #[error("User directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// commercetools API operation failed.
    #[error("commercetools error: {0}")]
    Commercetools(#[from] CommercetoolsError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A backend this screen needs is not configured.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Directory(err) => match err {
                DirectoryError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DirectoryError::Conflict { .. } | DirectoryError::Duplicate { .. } => {
                    StatusCode::CONFLICT
                }
                DirectoryError::NotFound(_) => StatusCode::NOT_FOUND,
                DirectoryError::Malformed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                DirectoryError::Store(StoreError::Encode(_) | StoreError::Unexpected(_)) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                DirectoryError::Store(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Commercetools(CommercetoolsError::NotFound(_)) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Commercetools(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match status {
            StatusCode::BAD_GATEWAY => {
                "The commerce platform could not be reached. Please try again.".to_string()
            }
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vip_admin_core::UserKey;
    use vip_admin_core::projection::{FormField, ValidationErrors};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order-123".to_string());
        assert_eq!(err.to_string(), "Not found: order-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_directory_error_status_codes() {
        let mut errors = ValidationErrors::default();
        errors.add(FormField::Email, "Email is required");
        assert_eq!(
            get_status(DirectoryError::Invalid(errors).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(
                DirectoryError::Conflict {
                    key: UserKey::new("user-1")
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(
                DirectoryError::Duplicate {
                    key: UserKey::new("ana~example.com")
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(DirectoryError::NotFound("x".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(
                DirectoryError::Store(StoreError::Backend(CommercetoolsError::Unauthorized)).into()
            ),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_reference_load_failure_renders_platform_notice() {
        let err: AppError =
            DirectoryError::Store(StoreError::Backend(CommercetoolsError::RateLimited(30))).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "The commerce platform could not be reached. Please try again."
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(CommercetoolsError::RateLimited(2).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(CommercetoolsError::NotFound("p1".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unavailable("memory".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
