//! Order queries: paged list filtered by distribution channel, and detail.

use serde::Serialize;
use tracing::instrument;
use vip_admin_core::projection::format_iso_timestamp;
use vip_admin_core::query::{PageRequest, SortSpec, orders_by_channel};
use vip_admin_core::{DisplayConfig, PagedResult, localized_value};

use super::CommercetoolsError;
use super::client::CommercetoolsClient;
use super::queries::{FETCH_ORDER_BY_ID, FETCH_ORDERS};
use super::types::{Address, LineItem, Money, OrderData, OrderNode, OrdersData};

#[derive(Debug, Serialize)]
struct OrdersVariables {
    #[serde(rename = "where")]
    where_clause: Option<String>,
    sort: Vec<String>,
    limit: u32,
    offset: u32,
}

#[derive(Debug, Serialize)]
struct OrderVariables<'a> {
    id: &'a str,
}

/// An order as a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub id: String,
    pub order_number: String,
    pub customer_email: String,
    pub order_state: String,
    pub payment_state: String,
    pub shipment_state: String,
    pub total: String,
    pub created_at: String,
    pub last_modified_at: String,
}

impl OrderSummary {
    #[must_use]
    pub fn from_node(node: &OrderNode, config: &DisplayConfig) -> Self {
        let or_placeholder =
            |value: Option<&String>| value.cloned().unwrap_or_else(|| config.placeholder.clone());

        Self {
            id: node.id.clone(),
            order_number: or_placeholder(node.order_number.as_ref()),
            customer_email: or_placeholder(node.customer_email.as_ref()),
            order_state: node.order_state.clone(),
            payment_state: or_placeholder(node.payment_state.as_ref()),
            shipment_state: or_placeholder(node.shipment_state.as_ref()),
            total: node.total_price.display(),
            created_at: format_iso_timestamp(&node.created_at, config),
            last_modified_at: format_iso_timestamp(&node.last_modified_at, config),
        }
    }
}

/// An order with line items and addresses.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub summary: OrderSummary,
    pub customer_id: String,
    pub line_items: Vec<LineItemRow>,
    pub shipping_address: Option<AddressView>,
    pub billing_address: Option<AddressView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemRow {
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_price: String,
    pub total: String,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressView {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
}

impl OrderDetail {
    #[must_use]
    pub fn from_node(node: &OrderNode, config: &DisplayConfig) -> Self {
        Self {
            summary: OrderSummary::from_node(node, config),
            customer_id: node
                .customer_id
                .clone()
                .unwrap_or_else(|| config.placeholder.clone()),
            line_items: node
                .line_items
                .iter()
                .map(|item| LineItemRow::from_item(item, config))
                .collect(),
            shipping_address: node
                .shipping_address
                .as_ref()
                .map(|a| AddressView::from_address(a, config)),
            billing_address: node
                .billing_address
                .as_ref()
                .map(|a| AddressView::from_address(a, config)),
        }
    }
}

impl LineItemRow {
    fn from_item(item: &LineItem, config: &DisplayConfig) -> Self {
        let placeholder = || config.placeholder.clone();
        Self {
            name: localized_value(&item.name_all_locales, &config.locale)
                .map_or_else(placeholder, str::to_string),
            sku: item
                .variant
                .as_ref()
                .and_then(|v| v.sku.clone())
                .unwrap_or_else(placeholder),
            quantity: item.quantity,
            unit_price: item
                .price
                .as_ref()
                .map_or_else(placeholder, |p| p.value.display()),
            total: item.total_price.as_ref().map_or_else(placeholder, Money::display),
            channel: item
                .distribution_channel
                .as_ref()
                .map_or_else(placeholder, |c| c.id.clone()),
        }
    }
}

impl AddressView {
    fn from_address(address: &Address, config: &DisplayConfig) -> Self {
        let placeholder = || config.placeholder.clone();
        Self {
            name: address.full_name().unwrap_or_else(placeholder),
            address: address.one_line().unwrap_or_else(placeholder),
            email: address.email.clone().unwrap_or_else(placeholder),
            phone: address.phone.clone().unwrap_or_else(placeholder),
        }
    }
}

impl CommercetoolsClient {
    /// One page of orders, optionally limited to line items shipped from a
    /// distribution channel. `all` or an empty channel lists every order.
    ///
    /// # Errors
    ///
    /// Returns `CommercetoolsError` if the API call fails.
    #[instrument(skip(self))]
    pub async fn orders(
        &self,
        channel_id: Option<&str>,
        sort: &SortSpec,
        page: PageRequest,
    ) -> Result<PagedResult<OrderNode>, CommercetoolsError> {
        let variables = OrdersVariables {
            where_clause: orders_by_channel(channel_id),
            sort: vec![sort.to_string()],
            limit: page.limit(),
            offset: page.offset(),
        };

        let data: OrdersData = self.execute("FetchOrders", FETCH_ORDERS, variables).await?;
        Ok(data.orders.into())
    }

    /// A single order.
    ///
    /// # Errors
    ///
    /// Returns `CommercetoolsError` if the API call fails.
    #[instrument(skip(self))]
    pub async fn order(&self, id: &str) -> Result<Option<OrderNode>, CommercetoolsError> {
        let result: Result<OrderData, _> = self
            .execute("FetchOrderById", FETCH_ORDER_BY_ID, OrderVariables { id })
            .await;

        match result {
            Ok(data) => Ok(data.order),
            Err(CommercetoolsError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn node() -> OrderNode {
        serde_json::from_value(json!({
            "id": "o1",
            "orderNumber": "1001",
            "customerEmail": "ana@example.com",
            "orderState": "Open",
            "paymentState": "Paid",
            "totalPrice": {"currencyCode": "EUR", "centAmount": 4500, "fractionDigits": 2},
            "createdAt": "2024-05-01T12:00:00.000Z",
            "lastModifiedAt": "2024-05-02T08:05:00.000Z",
            "lineItems": [{
                "id": "li1",
                "nameAllLocales": [{"locale": "es", "value": "Entrada VIP"}],
                "quantity": 3,
                "variant": {"sku": "VIP-1"},
                "price": {"value": {"currencyCode": "EUR", "centAmount": 1500, "fractionDigits": 2}},
                "totalPrice": {"currencyCode": "EUR", "centAmount": 4500, "fractionDigits": 2},
                "distributionChannel": {"id": "ch-1"}
            }],
            "shippingAddress": {"firstName": "Ana", "city": "Madrid", "country": "ES"}
        }))
        .unwrap()
    }

    #[test]
    fn test_summary_columns() {
        let summary = OrderSummary::from_node(&node(), &DisplayConfig::default());
        assert_eq!(summary.order_number, "1001");
        assert_eq!(summary.total, "EUR 45.00");
        assert_eq!(summary.shipment_state, "-");
        assert_eq!(summary.created_at, "2024-05-01 12:00");
    }

    #[test]
    fn test_detail_line_items_and_addresses() {
        let detail = OrderDetail::from_node(&node(), &DisplayConfig::default());
        assert_eq!(
            detail.line_items,
            vec![LineItemRow {
                name: "Entrada VIP".to_string(),
                sku: "VIP-1".to_string(),
                quantity: 3,
                unit_price: "EUR 15.00".to_string(),
                total: "EUR 45.00".to_string(),
                channel: "ch-1".to_string(),
            }]
        );
        let shipping = detail.shipping_address.unwrap();
        assert_eq!(shipping.name, "Ana");
        assert_eq!(shipping.address, "Madrid, ES");
        assert!(detail.billing_address.is_none());
        assert_eq!(detail.customer_id, "-");
    }

    #[test]
    fn test_all_channels_send_no_predicate() {
        let json = serde_json::to_value(OrdersVariables {
            where_clause: orders_by_channel(Some("all")),
            sort: vec![SortSpec::desc("createdAt").to_string()],
            limit: 10,
            offset: 0,
        })
        .unwrap();
        assert!(json["where"].is_null());
        assert_eq!(json["sort"][0], "createdAt desc");
    }
}
