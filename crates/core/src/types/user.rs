//! Application users persisted as platform custom objects.
//!
//! A user is one custom object in the users container. Its `value` is a JSON
//! document; on reads the platform may hand it back either as an object or as
//! a JSON-encoded string, and mutations always send it as a string.
//! [`parse_user_value`] is the only place that decoding happens.

use core::fmt;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::email::Email;
use super::id::CustomObjectId;

// =============================================================================
// Role
// =============================================================================

/// A role granted to an application user.
///
/// Stored as a plain string so records carrying roles this build does not
/// know about still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Full access to user management.
    pub const ADMIN: &'static str = "admin";
    /// Regular provider staff.
    pub const USER: &'static str = "user";

    /// Create a role from its stored name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The `admin` role.
    #[must_use]
    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    /// The `user` role.
    #[must_use]
    pub fn user() -> Self {
        Self::new(Self::USER)
    }

    /// The stored role name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Roles offered in forms and filters.
    #[must_use]
    pub fn known() -> [Self; 2] {
        [Self::admin(), Self::user()]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Keys and identity
// =============================================================================

/// Lookup key of a user custom object. Unique within the container and
/// immutable once the record exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserKey(String);

impl UserKey {
    /// Wrap an existing key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Generate a fresh key for a record created from the admin form.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("user-{}", uuid::Uuid::new_v4().simple()))
    }

    /// Key derived from the platform user id.
    #[must_use]
    pub fn from_platform_user_id(user_id: &str) -> Self {
        Self(user_id.to_string())
    }

    /// Legacy key derived from the email: lower-cased with `@` replaced by `~`
    /// (custom object keys may not contain `@`).
    #[must_use]
    pub fn from_email(email: &Email) -> Self {
        Self(email.as_str().replace('@', "~"))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the signed-in platform user maps to a user record key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityScheme {
    /// Key is the platform user id (canonical).
    #[default]
    PlatformId,
    /// Key is the lower-cased email with `@` replaced by `~` (legacy).
    EmailKey,
}

impl std::str::FromStr for IdentityScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "platform-id" => Ok(Self::PlatformId),
            "email-key" => Ok(Self::EmailKey),
            other => Err(format!(
                "unknown identity scheme '{other}' (expected platform-id or email-key)"
            )),
        }
    }
}

/// The signed-in platform user, as forwarded by the proxy in front of the admin.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserIdentity {
    /// Platform user id, when known.
    pub user_id: Option<String>,
    /// Platform user email, when known.
    pub email: Option<Email>,
}

impl UserIdentity {
    /// Record key under the given scheme.
    #[must_use]
    pub fn key(&self, scheme: IdentityScheme) -> Option<UserKey> {
        match scheme {
            IdentityScheme::PlatformId => self
                .user_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .map(UserKey::from_platform_user_id),
            IdentityScheme::EmailKey => self.email.as_ref().map(UserKey::from_email),
        }
    }

    /// Key under the other scheme, tried when the primary lookup misses.
    #[must_use]
    pub fn fallback_key(&self, scheme: IdentityScheme) -> Option<UserKey> {
        let other = match scheme {
            IdentityScheme::PlatformId => IdentityScheme::EmailKey,
            IdentityScheme::EmailKey => IdentityScheme::PlatformId,
        };
        self.key(other).filter(|key| Some(key) != self.key(scheme).as_ref())
    }
}

// =============================================================================
// Value payload
// =============================================================================

/// Errors decoding a stored user value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValueError {
    /// The encoded string is not JSON.
    #[error("user value is not valid JSON: {0}")]
    Malformed(String),
    /// The JSON is not an object.
    #[error("user value is not a JSON object")]
    NotAnObject,
    /// The object has fields of the wrong type.
    #[error("user value has an unexpected shape: {0}")]
    Shape(String),
}

/// The JSON payload of a user record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserValue {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: BTreeSet<Role>,
    /// Distribution channel ids the user supplies for.
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_selection_ids: Vec<String>,
    /// Coarse provider kinds (`f&b`, `vip`, `merchandising`).
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub element_type_ids: Vec<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields written by other tools, carried through updates untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl UserValue {
    /// Encode as the JSON string sent in `createOrUpdateCustomObject`.
    ///
    /// # Errors
    ///
    /// Returns an error if a field in `extra` cannot be serialized.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Whether the user holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }
}

/// Decode a stored user value.
///
/// Accepts a JSON object, or a JSON string whose content is an object.
///
/// # Errors
///
/// Returns [`UserValueError`] if the string is not JSON, the payload is not an
/// object, or a field has the wrong type.
pub fn parse_user_value(raw: &Value) -> Result<UserValue, UserValueError> {
    let object = match raw {
        Value::String(encoded) => serde_json::from_str::<Value>(encoded)
            .map_err(|e| UserValueError::Malformed(e.to_string()))?,
        other => other.clone(),
    };

    if !object.is_object() {
        return Err(UserValueError::NotAnObject);
    }

    serde_json::from_value(object).map_err(|e| UserValueError::Shape(e.to_string()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps written by older clients are not always valid; an unreadable
/// timestamp is treated as missing rather than failing the whole record.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

// =============================================================================
// Records
// =============================================================================

/// A user custom object as read from the store, value not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: CustomObjectId,
    pub key: UserKey,
    /// Concurrency token; must be echoed unchanged on update.
    pub version: i64,
    pub value: Value,
}

impl StoredUser {
    /// Decode the value into a [`UserRecord`].
    ///
    /// # Errors
    ///
    /// Returns [`UserValueError`] if the stored value cannot be decoded.
    pub fn parse(&self) -> Result<UserRecord, UserValueError> {
        Ok(UserRecord {
            id: self.id.clone(),
            key: self.key.clone(),
            version: self.version,
            value: parse_user_value(&self.value)?,
        })
    }
}

/// A decoded user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: CustomObjectId,
    pub key: UserKey,
    pub version: i64,
    pub value: UserValue,
}
