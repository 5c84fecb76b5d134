//! User management route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, RawForm, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;
use vip_admin_core::editing::{EditError, EditForm, EditSession};
use vip_admin_core::listing::SEARCH_DEBOUNCE;
use vip_admin_core::projection::{FormField, UserFormValues, UserRow, ValidationErrors};
use vip_admin_core::query::{RoleFilter, StatusFilter, UserListState};
use vip_admin_core::resolve::{ELEMENT_TYPE_LABELS, ReferenceSet};
use vip_admin_core::{CustomObjectId, IdentityScheme, Role, UserIdentity, UserRecord};

use crate::{
    error::AppError,
    filters,
    middleware::CurrentUser,
    services::DirectoryError,
    state::AppState,
};

use super::{
    CurrentUserView, Pagination, SelectOption, per_page_options, reference_options, render,
};

// =============================================================================
// Templates
// =============================================================================

/// User list page template.
#[derive(Template)]
#[template(path = "users/index.html")]
pub struct UsersIndexTemplate {
    pub current_user: CurrentUserView,
    pub current_path: String,
    pub rows: Vec<UserRow>,
    pub search: String,
    pub role_options: Vec<SelectOption>,
    pub status_options: Vec<SelectOption>,
    pub per_page_options: Vec<SelectOption>,
    pub pagination: Pagination,
    pub search_debounce_ms: u128,
}

/// Validation message per form input.
#[derive(Debug, Clone, Default)]
pub struct FieldErrors {
    pub platform_user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Option<String>,
    pub providers: Option<String>,
    pub categories: Option<String>,
    pub product_selections: Option<String>,
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let message = |field| errors.get(field).map(str::to_string);
        Self {
            platform_user_id: message(FormField::PlatformUserId),
            email: message(FormField::Email),
            name: message(FormField::Name),
            roles: message(FormField::Roles),
            providers: message(FormField::Providers),
            categories: message(FormField::Categories),
            product_selections: message(FormField::ProductSelections),
        }
    }
}

/// Create/edit form template.
#[derive(Template)]
#[template(path = "users/form.html")]
pub struct UserFormTemplate {
    pub current_user: CurrentUserView,
    pub current_path: String,
    pub title: String,
    pub action: String,
    pub key: Option<String>,
    pub version: Option<i64>,
    /// Only new records under the platform-id scheme are keyed by it.
    pub ask_platform_user_id: bool,
    pub platform_user_id: String,
    pub email: String,
    pub name: String,
    pub active: bool,
    pub role_options: Vec<SelectOption>,
    pub provider_options: Vec<SelectOption>,
    pub category_options: Vec<SelectOption>,
    pub selection_options: Vec<SelectOption>,
    pub element_type_options: Vec<SelectOption>,
    pub errors: FieldErrors,
    pub save_error: Option<String>,
}

impl UserFormTemplate {
    fn new(
        form: &EditForm,
        references: &ReferenceSet,
        locale: &str,
        identity: &UserIdentity,
        scheme: IdentityScheme,
    ) -> Self {
        let values = &form.values;
        let (title, action, current_path) = match &form.original {
            Some(record) => (
                format!("Edit {}", record.value.email),
                format!("/users/{}", record.id),
                format!("/users/{}/edit", record.id),
            ),
            None => (
                "New user".to_string(),
                "/users".to_string(),
                "/users/new".to_string(),
            ),
        };

        let mut role_options: Vec<SelectOption> = Role::known()
            .iter()
            .map(|role| {
                SelectOption::new(role.as_str(), role.as_str(), values.roles.iter().any(|r| r == role.as_str()))
            })
            .collect();
        for role in &values.roles {
            if !role_options.iter().any(|o| &o.value == role) {
                role_options.push(SelectOption::new(role.clone(), role.clone(), true));
            }
        }

        let element_type_options = ELEMENT_TYPE_LABELS
            .iter()
            .map(|(id, label)| {
                SelectOption::new(*id, *label, values.element_type_ids.iter().any(|v| v == id))
            })
            .collect();

        Self {
            current_user: CurrentUserView::from(identity),
            current_path,
            title,
            action,
            key: form.original.as_ref().map(|r| r.key.to_string()),
            version: form.original.as_ref().map(|r| r.version),
            ask_platform_user_id: form.original.is_none() && scheme == IdentityScheme::PlatformId,
            platform_user_id: values.platform_user_id.clone(),
            email: values.email.clone(),
            name: values.name.clone(),
            active: values.active,
            role_options,
            provider_options: reference_options(&references.channels, &values.provider_ids, locale),
            category_options: reference_options(&references.categories, &values.category_ids, locale),
            selection_options: reference_options(
                &references.product_selections,
                &values.product_selection_ids,
                locale,
            ),
            element_type_options,
            errors: FieldErrors::from(&form.errors),
            save_error: form.save_error.clone(),
        }
    }
}

// =============================================================================
// Request types
// =============================================================================

/// Query parameters of the user list.
#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub search: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl UserListParams {
    /// List state for these parameters. The page is applied last since
    /// every filter change resets it.
    fn to_state(&self) -> Result<UserListState, AppError> {
        let mut state = UserListState::new();
        if let Some(search) = &self.search {
            state.set_search(search.as_str());
        }
        if let Some(role) = &self.role {
            state.set_role(role.parse::<RoleFilter>().unwrap_or_default());
        }
        if let Some(status) = &self.status {
            let status: StatusFilter = status.parse().map_err(AppError::BadRequest)?;
            state.set_status(status);
        }
        if let Some(per_page) = self.per_page {
            state.set_per_page(per_page);
        }
        if let Some(page) = self.page {
            state.set_page(page);
        }
        Ok(state)
    }
}

/// A submitted create/edit form.
#[derive(Debug)]
struct SubmittedUser {
    values: UserFormValues,
    version: Option<i64>,
}

/// Parse a url-encoded user form. Multi-selects repeat their field name.
fn parse_user_form(body: &[u8]) -> Result<SubmittedUser, AppError> {
    let mut values = UserFormValues {
        roles: Vec::new(),
        active: false,
        ..UserFormValues::default()
    };
    let mut version = None;

    for (name, value) in url::form_urlencoded::parse(body) {
        let list = match name.as_ref() {
            "platform_user_id" => {
                values.platform_user_id = value.trim().to_string();
                continue;
            }
            "email" => {
                values.email = value.into_owned();
                continue;
            }
            "name" => {
                values.name = value.into_owned();
                continue;
            }
            "active" => {
                values.active = matches!(value.as_ref(), "on" | "true");
                continue;
            }
            "version" => {
                let parsed = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| AppError::BadRequest(format!("invalid version: {value}")))?;
                version = Some(parsed);
                continue;
            }
            "roles" => &mut values.roles,
            "provider_ids" => &mut values.provider_ids,
            "category_ids" => &mut values.category_ids,
            "product_selection_ids" => &mut values.product_selection_ids,
            "element_type_ids" => &mut values.element_type_ids,
            _ => continue,
        };
        if !value.trim().is_empty() {
            list.push(value.into_owned());
        }
    }

    Ok(SubmittedUser { values, version })
}

/// Activate/deactivate form.
#[derive(Debug, Deserialize)]
pub struct ActiveForm {
    pub version: i64,
    pub active: bool,
}

// =============================================================================
// Router
// =============================================================================

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(index).post(create))
        .route("/users/new", get(new_form))
        .route("/users/{id}", post(update))
        .route("/users/{id}/edit", get(edit_form))
        .route("/users/{id}/active", post(set_active))
}

// =============================================================================
// Handlers
// =============================================================================

/// User list page handler.
#[instrument(skip(identity, state))]
pub async fn index(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> Result<Html<String>, AppError> {
    let list_state = params.to_state()?;
    let page = state.users().list(&list_state).await?;

    let role = list_state.role().to_string();
    let status = list_state.status().to_string();
    let pagination = Pagination::new(
        "/users",
        &[
            ("search", list_state.search()),
            ("role", role.as_str()),
            ("status", status.as_str()),
        ],
        page.page,
        page.per_page,
        page.total,
    );

    let mut role_options = vec![SelectOption::new("all", "All roles", role == "all")];
    role_options.extend(
        Role::known()
            .iter()
            .map(|r| SelectOption::new(r.as_str(), r.as_str(), role == r.as_str())),
    );

    let status_options = [
        (StatusFilter::All, "Any status"),
        (StatusFilter::Active, "Active"),
        (StatusFilter::Inactive, "Inactive"),
    ]
    .into_iter()
    .map(|(filter, label)| SelectOption::new(filter.to_string(), label, filter == list_state.status()))
    .collect();

    let template = UsersIndexTemplate {
        current_user: CurrentUserView::from(&identity),
        current_path: "/users".to_string(),
        rows: page.rows,
        search: list_state.search().to_string(),
        role_options,
        status_options,
        per_page_options: per_page_options(list_state.per_page()),
        pagination,
        search_debounce_ms: SEARCH_DEBOUNCE.as_millis(),
    };

    Ok(render(&template))
}

/// Create form handler.
#[instrument(skip(identity, state))]
pub async fn new_form(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let mut session = EditSession::for_scheme(state.users().scheme());
    session.begin(None).map_err(edit_error)?;
    form_response(&state, &identity, &session, StatusCode::OK).await
}

/// Create handler.
#[instrument(skip(identity, state, body))]
pub async fn create(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let submitted = parse_user_form(&body)?;
    submit(&state, &identity, None, submitted.values).await
}

/// Edit form handler. The form is a snapshot of the record as loaded now.
#[instrument(skip(identity, state))]
pub async fn edit_form(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let record = load(&state, &CustomObjectId::new(id)).await?;

    let mut session = EditSession::for_scheme(state.users().scheme());
    session.begin(Some(record)).map_err(edit_error)?;
    form_response(&state, &identity, &session, StatusCode::OK).await
}

/// Update handler. The hidden `version` field carries the version the form
/// was loaded with.
#[instrument(skip(identity, state, body))]
pub async fn update(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let submitted = parse_user_form(&body)?;
    let version = submitted
        .version
        .ok_or_else(|| AppError::BadRequest("missing version".to_string()))?;

    let mut record = load(&state, &CustomObjectId::new(id)).await?;
    record.version = version;
    submit(&state, &identity, Some(record), submitted.values).await
}

/// Activate/deactivate handler.
#[instrument(skip(state))]
pub async fn set_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<ActiveForm>,
) -> Result<Redirect, AppError> {
    state
        .users()
        .set_active(&CustomObjectId::new(id), form.version, form.active)
        .await?;
    Ok(Redirect::to("/users"))
}

// =============================================================================
// Helpers
// =============================================================================

async fn load(state: &AppState, id: &CustomObjectId) -> Result<UserRecord, AppError> {
    state
        .users()
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))
}

/// Validate and save the form; re-render it on field errors or a conflict.
async fn submit(
    state: &AppState,
    identity: &UserIdentity,
    original: Option<UserRecord>,
    values: UserFormValues,
) -> Result<Response, AppError> {
    let mut session = EditSession::for_scheme(state.users().scheme());
    session.begin(original).map_err(edit_error)?;
    session.update(values).map_err(edit_error)?;

    let draft = match session.submit(Utc::now()) {
        Ok(draft) => draft,
        Err(EditError::Invalid(errors)) => {
            tracing::debug!(fields = errors.len(), "user form rejected");
            return form_response(state, identity, &session, StatusCode::UNPROCESSABLE_ENTITY).await;
        }
        Err(e) => return Err(edit_error(e)),
    };

    match state.users().save_draft(&draft).await {
        Ok(_) => {
            session.saved().map_err(edit_error)?;
            Ok(Redirect::to("/users").into_response())
        }
        Err(err @ (DirectoryError::Conflict { .. } | DirectoryError::Duplicate { .. })) => {
            tracing::warn!(error = %err, "user save conflicted");
            session.save_failed(err.to_string()).map_err(edit_error)?;
            form_response(state, identity, &session, StatusCode::CONFLICT).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn form_response(
    state: &AppState,
    identity: &UserIdentity,
    session: &EditSession,
    status: StatusCode,
) -> Result<Response, AppError> {
    let form = session
        .form()
        .ok_or_else(|| AppError::Internal("user form is not open".to_string()))?;
    let references = state.users().references().await?;
    let template = UserFormTemplate::new(
        form,
        &references,
        &state.display().locale,
        identity,
        state.users().scheme(),
    );
    Ok((status, render(&template)).into_response())
}

fn edit_error(err: EditError) -> AppError {
    AppError::Internal(err.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vip_admin_core::query::DEFAULT_PER_PAGE;

    use super::*;

    #[test]
    fn test_parse_user_form_collects_multi_selects() {
        let body = b"platform_user_id=+mc-user-7+&email=Ana%40Example.com&name=Ana&roles=admin&roles=user\
&provider_ids=c1&provider_ids=c2&category_ids=&element_type_ids=vip&active=on&version=4";
        let submitted = parse_user_form(body).unwrap();

        assert_eq!(submitted.version, Some(4));
        let values = submitted.values;
        assert_eq!(values.platform_user_id, "mc-user-7");
        assert_eq!(values.email, "Ana@Example.com");
        assert_eq!(values.roles, vec!["admin", "user"]);
        assert_eq!(values.provider_ids, vec!["c1", "c2"]);
        assert!(values.category_ids.is_empty());
        assert_eq!(values.element_type_ids, vec!["vip"]);
        assert!(values.active);
    }

    #[test]
    fn test_parse_user_form_unchecked_active_is_false() {
        let submitted = parse_user_form(b"email=a%40b.co&name=A").unwrap();
        assert!(!submitted.values.active);
        assert!(submitted.values.roles.is_empty());
        assert!(submitted.version.is_none());
    }

    #[test]
    fn test_parse_user_form_rejects_bad_version() {
        assert!(matches!(
            parse_user_form(b"version=abc"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_list_params_apply_page_after_filters() {
        let params = UserListParams {
            search: Some("ana".to_string()),
            role: Some("admin".to_string()),
            status: Some("inactive".to_string()),
            page: Some(3),
            per_page: Some(20),
        };
        let state = params.to_state().unwrap();
        assert_eq!(state.search(), "ana");
        assert_eq!(state.role(), &RoleFilter::Role(Role::admin()));
        assert_eq!(state.status(), StatusFilter::Inactive);
        assert_eq!(state.per_page(), 20);
        assert_eq!(state.page(), 3);
    }

    #[test]
    fn test_list_params_defaults_and_errors() {
        let state = UserListParams::default().to_state().unwrap();
        assert_eq!(state.page(), 1);
        assert_eq!(state.per_page(), DEFAULT_PER_PAGE);

        let params = UserListParams {
            status: Some("sleeping".to_string()),
            ..UserListParams::default()
        };
        assert!(matches!(params.to_state(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_field_errors_from_validation() {
        let mut errors = ValidationErrors::default();
        errors.add(FormField::Email, "Email is required");
        let fields = FieldErrors::from(&errors);
        assert_eq!(fields.email.as_deref(), Some("Email is required"));
        assert!(fields.name.is_none());
    }
}
