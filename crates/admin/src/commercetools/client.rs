//! commercetools GraphQL API client.

use std::sync::Arc;
use std::time::Duration;

use graphql_client::{QueryBody, Response};
use secrecy::ExposeSecret;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::instrument;

use super::auth::{AccessToken, fetch_token};
use super::{CommercetoolsError, GraphQLError};
use crate::config::CommercetoolsConfig;

/// Request timeout for API and auth calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// commercetools GraphQL API client.
///
/// Cheap to clone; clones share the HTTP connection pool and token cache.
#[derive(Clone)]
pub struct CommercetoolsClient {
    inner: Arc<CommercetoolsClientInner>,
}

struct CommercetoolsClientInner {
    client: reqwest::Client,
    config: CommercetoolsConfig,
    endpoint: String,
    /// In-memory token cache
    token: RwLock<Option<AccessToken>>,
}

impl std::fmt::Debug for CommercetoolsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommercetoolsClient")
            .field("endpoint", &self.inner.endpoint)
            .finish_non_exhaustive()
    }
}

impl CommercetoolsClient {
    /// Create a client for the configured project. No request is made until
    /// the first query.
    ///
    /// # Errors
    ///
    /// Returns `CommercetoolsError::Http` if the HTTP client cannot be built.
    pub fn new(config: CommercetoolsConfig) -> Result<Self, CommercetoolsError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(CommercetoolsClientInner {
                client,
                endpoint: config.graphql_endpoint(),
                config,
                token: RwLock::new(None),
            }),
        })
    }

    /// The project key this client talks to.
    #[must_use]
    pub fn project_key(&self) -> &str {
        &self.inner.config.project_key
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Get a bearer token, fetching a new one if none is cached or the cached
    /// one expires within the refresh margin.
    async fn access_token(&self) -> Result<String, CommercetoolsError> {
        if let Some(token) = self.inner.token.read().await.as_ref()
            && !token.needs_refresh()
        {
            return Ok(token.access_token.expose_secret().to_string());
        }

        let mut guard = self.inner.token.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = guard.as_ref()
            && !token.needs_refresh()
        {
            return Ok(token.access_token.expose_secret().to_string());
        }

        let token = fetch_token(&self.inner.client, &self.inner.config).await?;
        let secret = token.access_token.expose_secret().to_string();
        *guard = Some(token);
        Ok(secret)
    }

    /// Drop the cached token so the next request fetches a new one.
    async fn clear_token(&self) {
        *self.inner.token.write().await = None;
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL operation.
    ///
    /// # Errors
    ///
    /// Returns `CommercetoolsError::RateLimited` on HTTP 429,
    /// `CommercetoolsError::Unauthorized` on HTTP 401, a classified error
    /// (`ConcurrentModification`, `DuplicateField`, `NotFound`) when the
    /// platform reports one, `CommercetoolsError::GraphQL` for other GraphQL
    /// errors, and `CommercetoolsError::Http` on network failures.
    #[instrument(skip(self, query, variables), fields(operation = %operation_name))]
    pub async fn execute<V, T>(
        &self,
        operation_name: &'static str,
        query: &'static str,
        variables: V,
    ) -> Result<T, CommercetoolsError>
    where
        V: Serialize + Send,
        T: DeserializeOwned,
    {
        let access_token = self.access_token().await?;

        let body = QueryBody {
            variables,
            query,
            operation_name,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(1);
            return Err(CommercetoolsError::RateLimited(retry_after));
        }

        // A rejected token is not retried; the next request fetches a fresh one.
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.clear_token().await;
            return Err(CommercetoolsError::Unauthorized);
        }

        let response_text = response.text().await?;

        let response: Response<T> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    status = %status,
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse commercetools GraphQL response"
                );
                return Err(CommercetoolsError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            tracing::debug!(errors = ?errors, "GraphQL errors in response");
            return Err(classify_errors(errors));
        }

        response.data.ok_or_else(|| {
            CommercetoolsError::GraphQL(vec![GraphQLError {
                message: format!("No data in response (HTTP {status})"),
                code: None,
                path: vec![],
            }])
        })
    }
}

/// Map GraphQL errors to the most specific error the first one allows.
fn classify_errors(errors: Vec<graphql_client::Error>) -> CommercetoolsError {
    let extension = |e: &graphql_client::Error, name: &str| {
        e.extensions
            .as_ref()
            .and_then(|ext| ext.get(name))
            .cloned()
    };

    if let Some(first) = errors.first() {
        let code = extension(first, "code");
        match code.as_ref().and_then(serde_json::Value::as_str) {
            Some("ConcurrentModification") => {
                return CommercetoolsError::ConcurrentModification {
                    current_version: extension(first, "currentVersion")
                        .and_then(|v| v.as_i64()),
                };
            }
            Some("DuplicateField") => {
                let value = extension(first, "duplicateValue")
                    .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                    .unwrap_or_else(|| first.message.clone());
                return CommercetoolsError::DuplicateField(value);
            }
            Some("ResourceNotFound") => {
                return CommercetoolsError::NotFound(first.message.clone());
            }
            _ => {}
        }
    }

    CommercetoolsError::GraphQL(
        errors
            .into_iter()
            .map(|e| GraphQLError {
                code: e
                    .extensions
                    .as_ref()
                    .and_then(|ext| ext.get("code"))
                    .and_then(|c| c.as_str())
                    .map(str::to_string),
                path: e.path.map_or_else(Vec::new, |p| {
                    p.into_iter()
                        .map(|fragment| match fragment {
                            graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                            graphql_client::PathFragment::Index(i) => {
                                serde_json::Value::Number(i.into())
                            }
                        })
                        .collect()
                }),
                message: e.message,
            })
            .collect(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn errors(value: serde_json::Value) -> Vec<graphql_client::Error> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_concurrent_modification_is_classified() {
        let err = classify_errors(errors(json!([{
            "message": "Object has a different version",
            "extensions": {"code": "ConcurrentModification", "currentVersion": 5}
        }])));
        assert!(matches!(
            err,
            CommercetoolsError::ConcurrentModification {
                current_version: Some(5)
            }
        ));
    }

    #[test]
    fn test_duplicate_field_is_classified() {
        let err = classify_errors(errors(json!([{
            "message": "duplicate key",
            "extensions": {"code": "DuplicateField", "field": "key", "duplicateValue": "user-1"}
        }])));
        assert!(matches!(err, CommercetoolsError::DuplicateField(v) if v == "user-1"));
    }

    #[test]
    fn test_not_found_is_classified() {
        let err = classify_errors(errors(json!([{
            "message": "The Resource with key 'x' was not found.",
            "extensions": {"code": "ResourceNotFound"}
        }])));
        assert!(matches!(err, CommercetoolsError::NotFound(_)));
    }

    #[test]
    fn test_unknown_code_stays_graphql() {
        let err = classify_errors(errors(json!([{
            "message": "Malformed predicate",
            "path": ["customObjects", 0],
            "extensions": {"code": "InvalidInput"}
        }])));
        let CommercetoolsError::GraphQL(list) = err else {
            panic!("expected GraphQL error");
        };
        assert_eq!(list[0].code.as_deref(), Some("InvalidInput"));
        assert_eq!(list[0].path, vec![json!("customObjects"), json!(0)]);
    }

    #[test]
    fn test_client_debug_hides_config() {
        let client = CommercetoolsClient::new(CommercetoolsConfig {
            project_key: "vip-dev".to_string(),
            client_id: "id".to_string(),
            client_secret: secrecy::SecretString::from("hidden-secret"),
            api_url: "https://api.example.com".to_string(),
            auth_url: "https://auth.example.com".to_string(),
            scopes: None,
        })
        .unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("https://api.example.com/vip-dev/graphql"));
        assert!(!debug.contains("hidden-secret"));
        assert_eq!(client.project_key(), "vip-dev");
    }
}
