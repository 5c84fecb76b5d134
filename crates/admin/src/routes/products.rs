//! Product screen handlers: products of a store, by category, by provider,
//! by product selection, and product detail.

use askama::Template;
use axum::{
    Router,
    extract::{Path, Query, State},
    response::Html,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;
use vip_admin_core::query::{PageRequest, SortSpec};
use vip_admin_core::resolve::{ELEMENT_TYPE_LABELS, ReferenceIndex};
use vip_admin_core::{DisplayConfig, PagedResult, UserIdentity};

use crate::{
    commercetools::products::{ProductDetail, ProductSummary, SelectionProducts},
    commercetools::types::ProductNode,
    error::AppError,
    filters,
    middleware::CurrentUser,
    state::AppState,
};

use super::{CurrentUserView, Pagination, SelectOption, per_page_options, render};

const NO_USER_RECORD: &str =
    "There is no user record for the signed-in user. Ask an administrator to create one.";

// =============================================================================
// Templates
// =============================================================================

/// A selector above the product table.
#[derive(Debug, Clone)]
pub struct Picker {
    pub name: &'static str,
    pub label: &'static str,
    pub options: Vec<SelectOption>,
}

/// Product table template, shared by every product screen.
#[derive(Template)]
#[template(path = "products/list.html")]
pub struct ProductsListTemplate {
    pub current_user: CurrentUserView,
    pub current_path: String,
    pub title: String,
    pub picker: Option<Picker>,
    pub notice: Option<String>,
    pub products: Vec<ProductSummary>,
    pub pagination: Option<Pagination>,
    pub per_page_options: Vec<SelectOption>,
}

impl ProductsListTemplate {
    fn new(path: &str, title: impl Into<String>, identity: &UserIdentity, page: PageRequest) -> Self {
        Self {
            current_user: CurrentUserView::from(identity),
            current_path: path.to_string(),
            title: title.into(),
            picker: None,
            notice: None,
            products: Vec::new(),
            pagination: None,
            per_page_options: per_page_options(page.per_page()),
        }
    }

    /// Fill the table with one page of products.
    fn show(
        &mut self,
        products: &PagedResult<ProductNode>,
        page: PageRequest,
        params: &[(&str, &str)],
        config: &DisplayConfig,
    ) {
        self.products = products
            .results
            .iter()
            .map(|node| ProductSummary::from_node(node, config))
            .collect();
        self.pagination = Some(Pagination::new(
            &self.current_path,
            params,
            page.page(),
            page.per_page(),
            products.total,
        ));
        if products.results.is_empty() && self.notice.is_none() {
            self.notice = Some("No products found.".to_string());
        }
    }
}

/// Product detail template.
#[derive(Template)]
#[template(path = "products/detail.html")]
pub struct ProductDetailTemplate {
    pub current_user: CurrentUserView,
    pub current_path: String,
    pub product: ProductDetail,
}

// =============================================================================
// Request types
// =============================================================================

/// Query parameters of the product screens.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub store: Option<String>,
    pub provider: Option<String>,
    pub selection: Option<String>,
}

impl ProductListParams {
    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page()),
            self.per_page.unwrap_or(defaults.per_page()),
        )
    }
}

/// Non-blank value of an optional parameter.
fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn product_sort() -> SortSpec {
    SortSpec::desc("lastModifiedAt")
}

// =============================================================================
// Router
// =============================================================================

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(by_store))
        .route("/products/by-category", get(by_category))
        .route("/products/by-provider", get(by_provider))
        .route("/products/by-selection", get(by_selection))
        .route("/products/{id}", get(detail))
}

// =============================================================================
// Handlers
// =============================================================================

/// Products of a store, through its first active product selection.
#[instrument(skip(identity, state))]
pub async fn by_store(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<Html<String>, AppError> {
    let client = state.commercetools()?;
    let page = params.page_request();
    let store = non_blank(params.store.as_ref());
    let references = state.users().references().await?;
    let locale = state.display().locale.as_str();

    let mut template = ProductsListTemplate::new("/products", "Products by store", &identity, page);
    template.picker = Some(Picker {
        name: "store",
        label: "Store",
        options: store_options(&references.stores, store, locale),
    });

    let Some(store) = store else {
        template.notice = Some("Choose a store.".to_string());
        return Ok(render(&template));
    };

    match client.products_in_store(store, page).await? {
        Some(selection) => show_selection(&mut template, &selection, page, &[("store", store)], &state),
        None => {
            template.notice = Some(format!("Store {store} has no active product selection."));
        }
    }

    Ok(render(&template))
}

/// Products in any of the signed-in user's categories.
#[instrument(skip(identity, state))]
pub async fn by_category(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<Html<String>, AppError> {
    let client = state.commercetools()?;
    let page = params.page_request();
    let mut template = ProductsListTemplate::new(
        "/products/by-category",
        "Products by category",
        &identity,
        page,
    );

    let Some(scope) = state.users().scope_for(&identity).await? else {
        template.notice = Some(NO_USER_RECORD.to_string());
        return Ok(render(&template));
    };

    if scope.category_ids.is_empty() {
        template.notice = Some("No categories are assigned to your user.".to_string());
    }
    let products = client
        .products_in_categories(&scope.category_ids, &product_sort(), page)
        .await?;
    template.show(&products, page, &[], state.display());

    Ok(render(&template))
}

/// Products carrying a provider key. Defaults to the signed-in user's first
/// element type.
#[instrument(skip(identity, state))]
pub async fn by_provider(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<Html<String>, AppError> {
    let client = state.commercetools()?;
    let page = params.page_request();
    let scope = state.users().scope_for(&identity).await?;

    let provider = non_blank(params.provider.as_ref())
        .map(str::to_string)
        .or_else(|| {
            scope
                .as_ref()
                .and_then(|s| s.default_provider_key())
                .map(str::to_string)
        });

    let mut template = ProductsListTemplate::new(
        "/products/by-provider",
        "Products by provider",
        &identity,
        page,
    );
    template.picker = Some(Picker {
        name: "provider",
        label: "Provider",
        options: ELEMENT_TYPE_LABELS
            .iter()
            .map(|(id, label)| SelectOption::new(*id, *label, provider.as_deref() == Some(*id)))
            .collect(),
    });

    let Some(provider) = provider else {
        template.notice = Some("Choose a provider.".to_string());
        return Ok(render(&template));
    };

    let products = client
        .products_by_provider(&provider, &product_sort(), page)
        .await?;
    template.show(&products, page, &[("provider", provider.as_str())], state.display());

    Ok(render(&template))
}

/// Products of one of the signed-in user's product selections.
#[instrument(skip(identity, state))]
pub async fn by_selection(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<Html<String>, AppError> {
    let client = state.commercetools()?;
    let page = params.page_request();
    let mut template = ProductsListTemplate::new(
        "/products/by-selection",
        "Products by selection",
        &identity,
        page,
    );

    let Some(scope) = state.users().scope_for(&identity).await? else {
        template.notice = Some(NO_USER_RECORD.to_string());
        return Ok(render(&template));
    };

    let selection = non_blank(params.selection.as_ref())
        .map(str::to_string)
        .or_else(|| scope.product_selection_ids.first().map(ToString::to_string));

    let references = state.users().references().await?;
    let locale = state.display().locale.as_str();
    template.picker = Some(Picker {
        name: "selection",
        label: "Product selection",
        options: scope
            .product_selection_ids
            .iter()
            .map(|id| {
                SelectOption::new(
                    id.to_string(),
                    references.product_selections.label(id.as_str(), locale),
                    selection.as_deref() == Some(id.as_str()),
                )
            })
            .collect(),
    });

    let Some(selection) = selection else {
        template.notice = Some("No product selections are assigned to your user.".to_string());
        return Ok(render(&template));
    };

    match client.products_in_selection(&selection, page).await? {
        Some(found) => show_selection(
            &mut template,
            &found,
            page,
            &[("selection", selection.as_str())],
            &state,
        ),
        None => {
            template.notice = Some(format!("Product selection {selection} was not found."));
        }
    }

    Ok(render(&template))
}

/// Product detail page handler.
#[instrument(skip(identity, state))]
pub async fn detail(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let client = state.commercetools()?;
    let (node, references) = tokio::try_join!(
        async { client.product(&id).await.map_err(AppError::from) },
        async { state.users().references().await.map_err(AppError::from) },
    )?;
    let node = node.ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let template = ProductDetailTemplate {
        current_user: CurrentUserView::from(&identity),
        current_path: format!("/products/{id}"),
        product: ProductDetail::from_node(&node, &references.categories, state.display()),
    };

    Ok(render(&template))
}

// =============================================================================
// Helpers
// =============================================================================

fn show_selection(
    template: &mut ProductsListTemplate,
    selection: &SelectionProducts,
    page: PageRequest,
    params: &[(&str, &str)],
    state: &AppState,
) {
    let config = state.display();
    template.title = format!("{} ({})", template.title, selection.name(&config.locale));
    template.show(&selection.products, page, params, config);
}

/// Stores that can be looked up by key.
fn store_options(stores: &ReferenceIndex, selected: Option<&str>, locale: &str) -> Vec<SelectOption> {
    stores
        .entities()
        .iter()
        .filter_map(|store| {
            let key = store.key.as_deref().filter(|k| !k.is_empty())?;
            Some(SelectOption::new(key, store.label(locale), selected == Some(key)))
        })
        .collect()
}
