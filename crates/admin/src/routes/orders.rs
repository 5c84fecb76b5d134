//! Orders route handlers.

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
use vip_admin_core::resolve::ReferenceIndex;

use crate::{
    commercetools::orders::{OrderDetail, OrderSummary},
    error::AppError,
    filters,
    middleware::CurrentUser,
    state::AppState,
};

use super::{CurrentUserView, Pagination, SelectOption, per_page_options, render};

/// Channel filter value that lists every order.
const ALL_CHANNELS: &str = "all";

/// Orders list template.
#[derive(Template)]
#[template(path = "orders/list.html")]
pub struct OrdersListTemplate {
    pub current_user: CurrentUserView,
    pub current_path: String,
    pub orders: Vec<OrderSummary>,
    pub channel_options: Vec<SelectOption>,
    pub per_page_options: Vec<SelectOption>,
    pub pagination: Pagination,
}

/// Order detail template.
#[derive(Template)]
#[template(path = "orders/detail.html")]
pub struct OrderDetailTemplate {
    pub current_user: CurrentUserView,
    pub current_path: String,
    pub order: OrderDetail,
}

/// Query parameters of the orders list.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub channel: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderListParams {
    fn channel(&self) -> &str {
        self.channel
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(ALL_CHANNELS)
    }
}

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(index))
        .route("/orders/{id}", get(detail))
}

/// Orders list page handler, newest first.
#[instrument(skip(identity, state))]
pub async fn index(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> Result<Html<String>, AppError> {
    let client = state.commercetools()?;
    let defaults = PageRequest::default();
    let page = PageRequest::new(
        params.page.unwrap_or(defaults.page()),
        params.per_page.unwrap_or(defaults.per_page()),
    );
    let channel = params.channel();

    let (orders, references) = tokio::try_join!(
        async {
            client
                .orders(Some(channel), &SortSpec::desc("createdAt"), page)
                .await
                .map_err(AppError::from)
        },
        async { state.users().references().await.map_err(AppError::from) },
    )?;

    let config = state.display();
    let template = OrdersListTemplate {
        current_user: CurrentUserView::from(&identity),
        current_path: "/orders".to_string(),
        orders: orders
            .results
            .iter()
            .map(|node| OrderSummary::from_node(node, config))
            .collect(),
        channel_options: channel_options(&references.channels, channel, &config.locale),
        per_page_options: per_page_options(page.per_page()),
        pagination: Pagination::new(
            "/orders",
            &[("channel", channel)],
            page.page(),
            page.per_page(),
            orders.total,
        ),
    };

    Ok(render(&template))
}

/// Order detail page handler.
#[instrument(skip(identity, state))]
pub async fn detail(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let node = state
        .commercetools()?
        .order(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    let template = OrderDetailTemplate {
        current_user: CurrentUserView::from(&identity),
        current_path: format!("/orders/{id}"),
        order: OrderDetail::from_node(&node, state.display()),
    };

    Ok(render(&template))
}

fn channel_options(channels: &ReferenceIndex, selected: &str, locale: &str) -> Vec<SelectOption> {
    let mut options = vec![SelectOption::new(
        ALL_CHANNELS,
        "All channels",
        selected == ALL_CHANNELS,
    )];
    options.extend(channels.entities().iter().map(|channel| {
        SelectOption::new(channel.id.clone(), channel.label(locale), channel.id == selected)
    }));
    options
}

#[cfg(test)]
mod tests {
    use vip_admin_core::ReferenceEntity;

    use super::*;

    #[test]
    fn test_blank_channel_means_all() {
        assert_eq!(OrderListParams::default().channel(), "all");
        let params = OrderListParams {
            channel: Some(" ".to_string()),
            ..OrderListParams::default()
        };
        assert_eq!(params.channel(), "all");
        let params = OrderListParams {
            channel: Some("ch-1".to_string()),
            ..OrderListParams::default()
        };
        assert_eq!(params.channel(), "ch-1");
    }

    #[test]
    fn test_channel_options_mark_selection() {
        let channels = ReferenceIndex::from_entities(vec![
            ReferenceEntity::new("ch-1").with_name("es", "Bar Norte"),
        ]);
        let options = channel_options(&channels, "ch-1", "es");
        assert_eq!(
            options,
            vec![
                SelectOption::new("all", "All channels", false),
                SelectOption::new("ch-1", "Bar Norte", true),
            ]
        );
    }
}
