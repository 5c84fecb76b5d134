//! Client-credentials authentication against the commercetools auth host.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::CommercetoolsError;
use crate::config::CommercetoolsConfig;

/// Seconds before expiry at which a token is replaced.
pub const REFRESH_MARGIN_SECS: i64 = 300;

/// Bearer token obtained from the auth host.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
    /// Scopes granted, space-separated.
    pub scope: Option<String>,
}

impl AccessToken {
    /// Check if the token will expire within the given number of seconds.
    #[must_use]
    pub fn expires_within(&self, seconds: i64) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - seconds
    }

    /// Whether the token should be replaced before the next request.
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.expires_within(REFRESH_MARGIN_SECS)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Request a token with the client-credentials grant.
///
/// # Errors
///
/// Returns `CommercetoolsError::AuthenticationFailed` if the credentials or
/// scopes are rejected, `CommercetoolsError::Http` on network failures.
#[instrument(skip(client, config), fields(client_id = %config.client_id))]
pub async fn fetch_token(
    client: &reqwest::Client,
    config: &CommercetoolsConfig,
) -> Result<AccessToken, CommercetoolsError> {
    let now = chrono::Utc::now().timestamp();

    let mut form = vec![("grant_type", "client_credentials")];
    if let Some(scopes) = config.scopes.as_deref() {
        form.push(("scope", scopes));
    }

    let response = client
        .post(config.token_endpoint())
        .basic_auth(&config.client_id, Some(config.client_secret.expose_secret()))
        .form(&form)
        .send()
        .await?;

    let status = response.status();

    if status.is_success() {
        let token: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = token.expires_in, "obtained commercetools access token");

        Ok(AccessToken {
            access_token: SecretString::from(token.access_token),
            expires_at: now + token.expires_in,
            scope: token.scope,
        })
    } else {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<TokenErrorResponse>(&body)
            .ok()
            .and_then(|e| e.error_description.or(e.message).or(e.error))
            .unwrap_or_else(|| body.chars().take(200).collect());

        Err(CommercetoolsError::AuthenticationFailed(format!(
            "HTTP {status}: {message}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_in: i64) -> AccessToken {
        AccessToken {
            access_token: SecretString::from("test"),
            expires_at: chrono::Utc::now().timestamp() + expires_in,
            scope: None,
        }
    }

    #[test]
    fn test_token_refresh_margin() {
        assert!(token(-10).needs_refresh());
        assert!(token(120).needs_refresh());
        assert!(!token(3600).needs_refresh());
    }

    #[test]
    fn test_expires_within() {
        let t = token(100);
        assert!(t.expires_within(200));
        assert!(!t.expires_within(10));
    }
}
