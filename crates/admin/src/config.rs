//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (unless `ADMIN_STORE=memory`)
//! - `CTP_PROJECT_KEY` - commercetools project key
//! - `CTP_CLIENT_ID` - API client id
//! - `CTP_CLIENT_SECRET` - API client secret
//! - `CTP_API_URL` - API host (e.g. `https://api.europe-west1.gcp.commercetools.com`)
//! - `CTP_AUTH_URL` - Auth host (e.g. `https://auth.europe-west1.gcp.commercetools.com`)
//!
//! ## Optional
//! - `CTP_SCOPES` - Space-separated OAuth scopes (default: none requested)
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_DATA_LOCALE` - Locale used for entity labels (default: es)
//! - `ADMIN_USERS_CONTAINER` - Custom object container for users (default: app-users)
//! - `ADMIN_USER_IDENTITY` - `platform-id` or `email-key` (default: platform-id)
//! - `ADMIN_STORE` - `commercetools` or `memory` (default: commercetools)
//! - `ADMIN_REFERENCE_TTL_SECS` - Reference data cache TTL (default: 60)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)
//! - `LOG_FORMAT` - `json` for JSON logs, anything else for text

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use vip_admin_core::IdentityScheme;

const DEFAULT_CONTAINER: &str = "app-users";
const DEFAULT_LOCALE: &str = "es";
const DEFAULT_REFERENCE_TTL_SECS: u64 = 60;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where user records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Custom objects in the commercetools project.
    #[default]
    Commercetools,
    /// Process memory; for local development and tests.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "commercetools" => Ok(Self::Commercetools),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected commercetools or memory, got '{other}'")),
        }
    }
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// commercetools API configuration; `None` with the memory store
    pub commercetools: Option<CommercetoolsConfig>,
    pub store: StoreBackend,
    /// Locale used to pick entity labels
    pub data_locale: String,
    /// Custom object container holding user records
    pub users_container: String,
    pub identity_scheme: IdentityScheme,
    /// How long loaded reference collections are reused
    pub reference_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// commercetools API configuration.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct CommercetoolsConfig {
    pub project_key: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// API host without trailing slash
    pub api_url: String,
    /// Auth host without trailing slash
    pub auth_url: String,
    pub scopes: Option<String>,
}

impl std::fmt::Debug for CommercetoolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommercetoolsConfig")
            .field("project_key", &self.project_key)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("auth_url", &self.auth_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl CommercetoolsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            project_key: get_required_env("CTP_PROJECT_KEY")?,
            client_id: get_required_env("CTP_CLIENT_ID")?,
            client_secret: get_required_secret("CTP_CLIENT_SECRET")?,
            api_url: get_required_url("CTP_API_URL")?,
            auth_url: get_required_url("CTP_AUTH_URL")?,
            scopes: get_optional_env("CTP_SCOPES").filter(|s| !s.trim().is_empty()),
        })
    }

    /// GraphQL endpoint of the project.
    #[must_use]
    pub fn graphql_endpoint(&self) -> String {
        format!("{}/{}/graphql", self.api_url, self.project_key)
    }

    /// OAuth token endpoint.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth/token", self.auth_url)
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("ADMIN_HOST", "127.0.0.1")?;
        let port = parse_env("ADMIN_PORT", "3001")?;
        let store: StoreBackend = parse_env("ADMIN_STORE", "commercetools")?;
        let identity_scheme: IdentityScheme = parse_env("ADMIN_USER_IDENTITY", "platform-id")?;
        let ttl_secs: u64 = parse_env(
            "ADMIN_REFERENCE_TTL_SECS",
            &DEFAULT_REFERENCE_TTL_SECS.to_string(),
        )?;

        let commercetools = match store {
            StoreBackend::Commercetools => Some(CommercetoolsConfig::from_env()?),
            StoreBackend::Memory => None,
        };

        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            commercetools,
            store,
            data_locale: get_env_or_default("ADMIN_DATA_LOCALE", DEFAULT_LOCALE),
            users_container: get_env_or_default("ADMIN_USERS_CONTAINER", DEFAULT_CONTAINER),
            identity_scheme,
            reference_ttl: Duration::from_secs(ttl_secs),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Configuration for a process-local instance with no platform access.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3001,
            commercetools: None,
            store: StoreBackend::Memory,
            data_locale: DEFAULT_LOCALE.to_string(),
            users_container: DEFAULT_CONTAINER.to_string(),
            identity_scheme: IdentityScheme::default(),
            reference_ttl: Duration::from_secs(DEFAULT_REFERENCE_TTL_SECS),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get a required URL, validated and stripped of its trailing slash.
fn get_required_url(key: &str) -> Result<String, ConfigError> {
    let value = get_required_env(key)?;
    normalize_url(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e))
}

fn normalize_url(value: &str) -> Result<String, String> {
    let parsed = url::Url::parse(value.trim()).map_err(|e| e.to_string())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", parsed.scheme()));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
