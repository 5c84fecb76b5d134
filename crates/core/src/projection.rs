//! Display rows and form values for user records.
//!
//! Rows are flat strings ready for a table cell; they are rebuilt on every
//! render and never written back. Form values go the other way: what the
//! edit form posts is validated and turned into a [`UserDraft`] for the store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::DisplayConfig;
use crate::resolve::{LABEL_SEPARATOR, ReferenceSet};
use crate::types::{
    Email, EmailError, IdentityScheme, Role, StoredUser, UserKey, UserRecord, UserValue,
};

/// Display format for timestamps in tables.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

// =============================================================================
// Rows
// =============================================================================

/// One user as a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: String,
    pub key: String,
    pub version: String,
    pub email: String,
    pub name: String,
    pub roles: String,
    pub providers: String,
    pub categories: String,
    pub product_selections: String,
    pub element_types: String,
    pub created_at: String,
    pub active: bool,
    /// The stored value could not be decoded; all value columns are empty.
    pub malformed: bool,
}

/// Project a decoded record into a row.
#[must_use]
pub fn project_user(record: &UserRecord, references: &ReferenceSet, config: &DisplayConfig) -> UserRow {
    let value = &record.value;
    let labels = references.resolve(value, config);
    let or_placeholder = |s: String| if s.is_empty() { config.placeholder.clone() } else { s };

    UserRow {
        id: record.id.to_string(),
        key: record.key.to_string(),
        version: record.version.to_string(),
        email: value.email.clone(),
        name: value.name.clone(),
        roles: or_placeholder(
            value
                .roles
                .iter()
                .map(Role::as_str)
                .collect::<Vec<_>>()
                .join(LABEL_SEPARATOR),
        ),
        providers: or_placeholder(labels.providers),
        categories: or_placeholder(labels.categories),
        product_selections: or_placeholder(labels.product_selections),
        element_types: or_placeholder(labels.element_types),
        created_at: format_timestamp(value.created_at, config),
        active: value.active,
        malformed: false,
    }
}

/// Project a stored record, rendering undecodable values as a placeholder row.
#[must_use]
pub fn project_stored_user(
    stored: &StoredUser,
    references: &ReferenceSet,
    config: &DisplayConfig,
) -> UserRow {
    match stored.parse() {
        Ok(record) => project_user(&record, references, config),
        Err(e) => {
            tracing::warn!(key = %stored.key, error = %e, "rendering malformed user record as placeholder");
            UserRow {
                id: stored.id.to_string(),
                key: stored.key.to_string(),
                version: stored.version.to_string(),
                email: String::new(),
                name: String::new(),
                roles: String::new(),
                providers: String::new(),
                categories: String::new(),
                product_selections: String::new(),
                element_types: String::new(),
                created_at: String::new(),
                active: false,
                malformed: true,
            }
        }
    }
}

/// Format an optional timestamp for display; missing ones show the placeholder.
#[must_use]
pub fn format_timestamp(at: Option<DateTime<Utc>>, config: &DisplayConfig) -> String {
    at.map_or_else(
        || config.placeholder.clone(),
        |at| at.format(TIMESTAMP_FORMAT).to_string(),
    )
}

/// Format a platform timestamp string; unparseable input is shown as-is.
#[must_use]
pub fn format_iso_timestamp(raw: &str, config: &DisplayConfig) -> String {
    if raw.trim().is_empty() {
        return config.placeholder.clone();
    }
    DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| raw.to_string(),
        |at| at.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string(),
    )
}

// =============================================================================
// Form values
// =============================================================================

/// Editable fields of a user, as shown in and posted by the user form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFormValues {
    /// Platform user id to key a new record by. Ignored for existing records.
    pub platform_user_id: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
    pub provider_ids: Vec<String>,
    pub category_ids: Vec<String>,
    pub product_selection_ids: Vec<String>,
    pub element_type_ids: Vec<String>,
    pub active: bool,
}

impl Default for UserFormValues {
    fn default() -> Self {
        Self {
            platform_user_id: String::new(),
            email: String::new(),
            name: String::new(),
            roles: vec![Role::USER.to_string()],
            provider_ids: Vec::new(),
            category_ids: Vec::new(),
            product_selection_ids: Vec::new(),
            element_type_ids: Vec::new(),
            active: true,
        }
    }
}

/// Initial form values: the record's fields, or defaults for a new user.
#[must_use]
pub fn user_to_form_values(record: Option<&UserRecord>) -> UserFormValues {
    let Some(record) = record else {
        return UserFormValues::default();
    };
    let value = &record.value;
    UserFormValues {
        platform_user_id: String::new(),
        email: value.email.clone(),
        name: value.name.clone(),
        roles: value.roles.iter().map(ToString::to_string).collect(),
        provider_ids: value.provider_ids.clone(),
        category_ids: value.category_ids.clone(),
        product_selection_ids: value.product_selection_ids.clone(),
        element_type_ids: value.element_type_ids.clone(),
        active: value.active,
    }
}

/// A user value ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub key: UserKey,
    /// Version of the record being updated; `None` creates.
    pub version: Option<i64>,
    pub value: UserValue,
}

impl UserDraft {
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.version.is_none()
    }
}

/// Key for a new record, so that the identity lookup of the signed-in user
/// finds it.
///
/// Under [`IdentityScheme::PlatformId`] the platform user id from the form is
/// used when given; otherwise, and always under [`IdentityScheme::EmailKey`],
/// the key is derived from the email. The lookup tries the email key as the
/// fallback of the platform id key, so both are reachable. An email that does
/// not parse (which validation rejects first) gets a generated key.
#[must_use]
pub fn new_user_key(values: &UserFormValues, scheme: IdentityScheme) -> UserKey {
    let platform_user_id = values.platform_user_id.trim();
    if scheme == IdentityScheme::PlatformId && !platform_user_id.is_empty() {
        return UserKey::from_platform_user_id(platform_user_id);
    }
    Email::parse(&values.email).map_or_else(|_| UserKey::generate(), |email| UserKey::from_email(&email))
}

/// Build the draft to save from form values.
///
/// The email is lower-cased. An existing record keeps its key, version,
/// `createdAt` and any fields the form does not edit; a new record is keyed
/// by [`new_user_key`] under `scheme` and gets `createdAt = now`. `updatedAt`
/// is always `now`.
#[must_use]
pub fn form_values_to_user(
    values: &UserFormValues,
    existing: Option<&UserRecord>,
    scheme: IdentityScheme,
    now: DateTime<Utc>,
) -> UserDraft {
    let (key, version, created_at, extra) = match existing {
        Some(record) => (
            record.key.clone(),
            Some(record.version),
            record.value.created_at.unwrap_or(now),
            record.value.extra.clone(),
        ),
        None => (new_user_key(values, scheme), None, now, serde_json::Map::new()),
    };

    UserDraft {
        key,
        version,
        value: UserValue {
            email: values.email.trim().to_lowercase(),
            name: values.name.trim().to_string(),
            roles: values.roles.iter().map(Role::new).collect(),
            provider_ids: values.provider_ids.clone(),
            category_ids: values.category_ids.clone(),
            product_selection_ids: values.product_selection_ids.clone(),
            element_type_ids: values.element_type_ids.clone(),
            active: values.active,
            created_at: Some(created_at),
            updated_at: Some(now),
            extra,
        },
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Form fields that carry validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    PlatformUserId,
    Email,
    Name,
    Roles,
    Providers,
    Categories,
    ProductSelections,
}

impl FormField {
    /// Name of the form input.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlatformUserId => "platform_user_id",
            Self::Email => "email",
            Self::Name => "name",
            Self::Roles => "roles",
            Self::Providers => "provider_ids",
            Self::Categories => "category_ids",
            Self::ProductSelections => "product_selection_ids",
        }
    }
}

/// Field-level validation failures. Never sent to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct ValidationErrors {
    errors: BTreeMap<FormField, String>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: FormField, message: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.errors.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

/// Check the form invariants.
///
/// # Errors
///
/// Returns every failing field with its message.
pub fn validate(values: &UserFormValues) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if !is_valid_key(values.platform_user_id.trim()) {
        errors.add(
            FormField::PlatformUserId,
            "Use letters, digits, '-', '_', '.' or '~' (up to 256 characters)",
        );
    }
    match Email::parse(&values.email) {
        Ok(_) => {}
        Err(EmailError::Empty) => errors.add(FormField::Email, "Email is required"),
        Err(_) => errors.add(FormField::Email, "Please enter a valid email address"),
    }
    if values.name.trim().is_empty() {
        errors.add(FormField::Name, "Please enter a name");
    }
    if values.roles.iter().all(|role| role.trim().is_empty()) {
        errors.add(FormField::Roles, "Select at least one role");
    }
    if values.provider_ids.is_empty() {
        errors.add(FormField::Providers, "Select at least one provider");
    }
    if values.category_ids.is_empty() {
        errors.add(FormField::Categories, "Select at least one category");
    }
    if values.product_selection_ids.is_empty() {
        errors.add(FormField::ProductSelections, "Select at least one product selection");
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Characters custom object keys accept. Empty means "not given".
fn is_valid_key(key: &str) -> bool {
    key.len() <= 256
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}
