//! Welcome page route handler.

use askama::Template;
use axum::{Router, extract::State, response::Html, routing::get};
use tracing::instrument;

use crate::{error::AppError, filters, middleware::CurrentUser, state::AppState};

use super::{CurrentUserView, render};

/// The signed-in user's own record, summarized.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub name: String,
    pub roles: String,
    pub active: bool,
}

/// Welcome page template.
#[derive(Template)]
#[template(path = "welcome.html")]
pub struct WelcomeTemplate {
    pub current_user: CurrentUserView,
    pub current_path: String,
    pub profile: Option<ProfileView>,
    pub platform_enabled: bool,
}

/// Build the welcome router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// Welcome page handler.
#[instrument(skip(identity, state))]
pub async fn index(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let profile = state
        .users()
        .find_by_identity(&identity)
        .await?
        .map(|record| ProfileView {
            name: record.value.name.clone(),
            roles: record
                .value
                .roles
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            active: record.value.active,
        });

    let template = WelcomeTemplate {
        current_user: CurrentUserView::from(&identity),
        current_path: "/".to_string(),
        profile,
        platform_enabled: state.commercetools().is_ok(),
    };

    Ok(render(&template))
}
