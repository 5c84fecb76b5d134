//! Response types for the queries in [`super::queries`].
//!
//! Field names follow the platform schema (camelCase); only the fields the
//! queries select are modelled.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use vip_admin_core::{
    CustomObjectId, LocalizedString, PagedResult, ReferenceEntity, StoredUser, UserKey,
    localized_value,
};

// =============================================================================
// Shared
// =============================================================================

/// A monetary amount in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub currency_code: String,
    pub cent_amount: i64,
    #[serde(default = "default_fraction_digits")]
    pub fraction_digits: u32,
}

const fn default_fraction_digits() -> u32 {
    2
}

impl Money {
    /// The amount as a decimal, e.g. `12.50`.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.cent_amount, self.fraction_digits)
    }

    /// `EUR 12.50`
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} {}", self.currency_code, self.amount())
    }
}

/// `{ id }` reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdRef {
    pub id: String,
}

/// Paged query result as returned by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct Paged<T> {
    pub total: u64,
    pub count: u64,
    pub offset: u64,
    pub results: Vec<T>,
}

impl<T> From<Paged<T>> for PagedResult<T> {
    fn from(page: Paged<T>) -> Self {
        Self {
            total: page.total,
            count: page.count,
            offset: page.offset,
            results: page.results,
        }
    }
}

// =============================================================================
// Reference collections
// =============================================================================

/// `{ channels | categories | productSelections | stores }` response, keyed by
/// the aliased field `page`.
#[derive(Debug, Deserialize)]
pub struct ReferencePageData {
    pub page: Paged<ReferenceEntity>,
}

/// A store with its product selection assignments.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreNode {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name_all_locales: Vec<LocalizedString>,
    #[serde(default)]
    pub product_selections: Vec<StoreProductSelection>,
}

impl StoreNode {
    /// The first active product selection assigned to the store.
    #[must_use]
    pub fn first_selection_id(&self) -> Option<&str> {
        self.product_selections
            .iter()
            .filter(|setting| setting.active.unwrap_or(true))
            .find_map(|setting| setting.product_selection.as_ref())
            .map(|selection| selection.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreProductSelection {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub product_selection: Option<IdRef>,
}

#[derive(Debug, Deserialize)]
pub struct StoreData {
    pub store: Option<StoreNode>,
}

// =============================================================================
// Custom objects
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomObjectNode {
    pub id: String,
    pub key: String,
    pub version: i64,
    pub value: Value,
}

impl From<CustomObjectNode> for StoredUser {
    fn from(node: CustomObjectNode) -> Self {
        Self {
            id: CustomObjectId::new(node.id),
            key: UserKey::new(node.key),
            version: node.version,
            value: node.value,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomObjectsData {
    pub custom_objects: Paged<CustomObjectNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomObjectData {
    pub custom_object: Option<CustomObjectNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCustomObjectData {
    pub create_or_update_custom_object: Option<CustomObjectNode>,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    pub version: i64,
    pub created_at: String,
    pub last_modified_at: String,
    #[serde(default)]
    pub product_type: Option<ProductTypeRef>,
    pub master_data: MasterData,
}

impl ProductNode {
    /// Name in `locale`, falling back to the first localized name.
    #[must_use]
    pub fn name(&self, locale: &str) -> Option<&str> {
        self.master_data
            .current
            .as_ref()
            .and_then(|c| localized_value(&c.name_all_locales, locale))
    }

    #[must_use]
    pub fn master_variant(&self) -> Option<&Variant> {
        self.master_data.current.as_ref().map(|c| &c.master_variant)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductTypeRef {
    #[serde(default)]
    pub key: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterData {
    pub published: bool,
    #[serde(default)]
    pub has_staged_changes: bool,
    #[serde(default)]
    pub current: Option<ProductData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    #[serde(default)]
    pub name_all_locales: Vec<LocalizedString>,
    #[serde(default)]
    pub description_all_locales: Option<Vec<LocalizedString>>,
    #[serde(default)]
    pub slug_all_locales: Vec<LocalizedString>,
    #[serde(default)]
    pub categories: Vec<ReferenceEntity>,
    pub master_variant: Variant,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: i64,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub prices: Option<Vec<Price>>,
    #[serde(default)]
    pub attributes_raw: Vec<RawAttribute>,
}

impl Variant {
    /// The first price, as listed by the platform.
    #[must_use]
    pub fn first_price(&self) -> Option<&Money> {
        self.prices
            .as_ref()
            .and_then(|prices| prices.first())
            .map(|price| &price.value)
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes_raw
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.value)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub value: Money,
    #[serde(default)]
    pub channel: Option<IdRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAttribute {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: Paged<ProductNode>,
}

#[derive(Debug, Deserialize)]
pub struct ProductByIdData {
    pub product: Option<ProductNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSelectionData {
    pub product_selection: Option<ProductSelectionNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSelectionNode {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name_all_locales: Vec<LocalizedString>,
    pub product_refs: Paged<AssignedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct AssignedProduct {
    #[serde(default)]
    pub product: Option<ProductNode>,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNode {
    pub id: String,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub order_state: String,
    #[serde(default)]
    pub payment_state: Option<String>,
    #[serde(default)]
    pub shipment_state: Option<String>,
    pub total_price: Money,
    pub created_at: String,
    pub last_modified_at: String,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub name_all_locales: Vec<LocalizedString>,
    pub quantity: i64,
    #[serde(default)]
    pub variant: Option<LineItemVariant>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub total_price: Option<Money>,
    #[serde(default)]
    pub distribution_channel: Option<IdRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemVariant {
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub street_name: Option<String>,
    #[serde(default)]
    pub street_number: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Address {
    /// Full name, or `None` when neither part is set.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        join_present(&[self.first_name.as_deref(), self.last_name.as_deref()], " ")
    }

    /// Single-line postal address.
    #[must_use]
    pub fn one_line(&self) -> Option<String> {
        let street = join_present(&[self.street_name.as_deref(), self.street_number.as_deref()], " ");
        let city = join_present(&[self.postal_code.as_deref(), self.city.as_deref()], " ");
        join_present(
            &[street.as_deref(), city.as_deref(), self.country.as_deref()],
            ", ",
        )
    }
}

fn join_present(parts: &[Option<&str>], separator: &str) -> Option<String> {
    let present: Vec<&str> = parts
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    (!present.is_empty()).then(|| present.join(separator))
}

#[derive(Debug, Deserialize)]
pub struct OrdersData {
    pub orders: Paged<OrderNode>,
}

#[derive(Debug, Deserialize)]
pub struct OrderData {
    pub order: Option<OrderNode>,
}
