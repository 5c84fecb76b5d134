//! Identity of the signed-in platform user, forwarded by the proxy.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use vip_admin_core::{Email, UserIdentity};

/// Header carrying the platform user id.
pub const USER_ID_HEADER: &str = "x-mc-user-id";
/// Header carrying the platform user email.
pub const USER_EMAIL_HEADER: &str = "x-mc-user-email";

/// The forwarded identity. Missing or malformed headers yield an empty
/// identity; screens that need a user record show a notice instead.
///
/// ```rust,ignore
/// async fn handler(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
///     identity.user_id.unwrap_or_default()
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub UserIdentity);

impl CurrentUser {
    /// Read the identity headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let email = header(USER_EMAIL_HEADER).and_then(|raw| match Email::parse(raw) {
            Ok(email) => Some(email),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed user email header");
                None
            }
        });

        Self(UserIdentity {
            user_id: header(USER_ID_HEADER).map(str::to_string),
            email,
        })
    }

    /// Whether any identity was forwarded.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.0.user_id.is_some() || self.0.email.is_some()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = Self::from_headers(&parts.headers);
        if let Some(email) = &user.0.email {
            sentry::configure_scope(|scope| {
                scope.set_user(Some(sentry::User {
                    id: user.0.user_id.clone(),
                    email: Some(email.to_string()),
                    ..Default::default()
                }));
            });
        }
        Ok(user)
    }
}
