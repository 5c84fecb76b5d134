//! HTTP route handlers for the admin panel.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (reference collections load)
//! GET  /                       - Welcome page
//!
//! # Users (custom objects)
//! GET  /users                  - User list (search, role, status, page, per_page)
//! GET  /users/new              - Create form
//! POST /users                  - Create user
//! GET  /users/{id}/edit        - Edit form
//! POST /users/{id}             - Update user (hidden version field)
//! POST /users/{id}/active      - Activate or deactivate
//!
//! # Products (read from the platform)
//! GET  /products?store=<key>   - Products of a store
//! GET  /products/by-category   - Products in the signed-in user's categories
//! GET  /products/by-provider   - Products for a provider key
//! GET  /products/by-selection  - Products of one of the user's selections
//! GET  /products/{id}          - Product detail
//!
//! # Orders (read from the platform)
//! GET  /orders                 - Orders, optional distribution channel filter
//! GET  /orders/{id}            - Order detail
//! ```

use askama::Template;
use axum::Router;
use axum::response::Html;
use vip_admin_core::UserIdentity;
use vip_admin_core::query::{PER_PAGE_OPTIONS, total_pages};
use vip_admin_core::resolve::ReferenceIndex;

use crate::state::AppState;

pub mod health;
pub mod orders;
pub mod products;
pub mod users;
pub mod welcome;

/// All page routes. Health checks are added by [`crate::app`].
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(welcome::router())
        .merge(users::router())
        .merge(products::router())
        .merge(orders::router())
}

// =============================================================================
// Shared view types
// =============================================================================

/// The signed-in platform user, for the page header.
#[derive(Debug, Clone, Default)]
pub struct CurrentUserView {
    pub label: String,
    pub known: bool,
}

impl From<&UserIdentity> for CurrentUserView {
    fn from(identity: &UserIdentity) -> Self {
        let label = identity
            .email
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| identity.user_id.clone());

        Self {
            known: label.is_some(),
            label: label.unwrap_or_else(|| "Unknown user".to_string()),
        }
    }
}

/// One `<option>` or checkbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

/// Options for every entity of a reference collection.
///
/// Selected ids missing from the collection are appended with the id as
/// label so that saving the form keeps them.
#[must_use]
pub fn reference_options(index: &ReferenceIndex, selected: &[String], locale: &str) -> Vec<SelectOption> {
    let mut options: Vec<SelectOption> = index
        .entities()
        .iter()
        .map(|entity| {
            SelectOption::new(
                entity.id.clone(),
                entity.label(locale),
                selected.contains(&entity.id),
            )
        })
        .collect();

    for id in selected {
        if index.get(id).is_none() {
            options.push(SelectOption::new(id.clone(), id.clone(), true));
        }
    }
    options
}

/// Options of the page size selector.
#[must_use]
pub fn per_page_options(current: u32) -> Vec<SelectOption> {
    PER_PAGE_OPTIONS
        .iter()
        .map(|n| SelectOption::new(n.to_string(), n.to_string(), *n == current))
        .collect()
}

/// Previous/next links of a paged table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u64,
    pub total: u64,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

impl Pagination {
    /// Links for `page` of a table at `path`. `params` are carried over to
    /// every link; empty values are left out.
    #[must_use]
    pub fn new(path: &str, params: &[(&str, &str)], page: u32, per_page: u32, total: u64) -> Self {
        let total_pages = total_pages(total, per_page);
        let href = |target: u32| {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            for (name, value) in params {
                if !value.is_empty() {
                    query.append_pair(name, value);
                }
            }
            query.append_pair("per_page", &per_page.to_string());
            query.append_pair("page", &target.to_string());
            format!("{path}?{}", query.finish())
        };

        Self {
            page,
            total_pages,
            total,
            prev_href: (page > 1).then(|| href(page - 1)),
            next_href: (u64::from(page) < total_pages).then(|| href(page + 1)),
        }
    }
}

/// Render a template, logging failures.
pub fn render(template: &impl Template) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}

#[cfg(test)]
mod tests {
    use vip_admin_core::{Email, ReferenceEntity};

    use super::*;

    #[test]
    fn test_pagination_links_keep_filters() {
        let pagination = Pagination::new("/users", &[("search", "ana b"), ("role", "")], 2, 10, 25);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(
            pagination.prev_href.as_deref(),
            Some("/users?search=ana+b&per_page=10&page=1")
        );
        assert_eq!(
            pagination.next_href.as_deref(),
            Some("/users?search=ana+b&per_page=10&page=3")
        );
    }

    #[test]
    fn test_pagination_single_page_has_no_links() {
        let pagination = Pagination::new("/orders", &[], 1, 20, 0);
        assert_eq!(pagination.total_pages, 1);
        assert!(pagination.prev_href.is_none());
        assert!(pagination.next_href.is_none());
    }

    #[test]
    fn test_reference_options_keep_unknown_selected_ids() {
        let index = ReferenceIndex::from_entities(vec![
            ReferenceEntity::new("c1").with_name("es", "Tienda A"),
            ReferenceEntity::new("c2").with_name("es", "Tienda B"),
        ]);
        let selected = vec!["c2".to_string(), "gone".to_string()];

        let options = reference_options(&index, &selected, "es");
        assert_eq!(
            options,
            vec![
                SelectOption::new("c1", "Tienda A", false),
                SelectOption::new("c2", "Tienda B", true),
                SelectOption::new("gone", "gone", true),
            ]
        );
    }

    #[test]
    fn test_current_user_view_prefers_email() {
        let identity = UserIdentity {
            user_id: Some("u-1".to_string()),
            email: Email::parse("ana@example.com").ok(),
        };
        let view = CurrentUserView::from(&identity);
        assert_eq!(view.label, "ana@example.com");
        assert!(view.known);

        let view = CurrentUserView::from(&UserIdentity::default());
        assert!(!view.known);
    }

    #[test]
    fn test_per_page_options_mark_current() {
        let options = per_page_options(20);
        assert_eq!(options.len(), PER_PAGE_OPTIONS.len());
        assert!(options.iter().any(|o| o.value == "20" && o.selected));
    }
}
