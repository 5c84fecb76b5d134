//! Product queries: by category, by provider, by product selection, by store
//! and single product detail.

use serde::Serialize;
use serde_json::Value;
use tracing::instrument;
use vip_admin_core::projection::format_iso_timestamp;
use vip_admin_core::query::{
    PROVIDER_ATTRIBUTE, PageRequest, SortSpec, products_by_provider, products_in_categories,
};
use vip_admin_core::resolve::ReferenceIndex;
use vip_admin_core::{CategoryId, DisplayConfig, LocalizedString, PagedResult, localized_value};

use super::CommercetoolsError;
use super::client::CommercetoolsClient;
use super::queries::{
    FETCH_PRODUCT_BY_ID, FETCH_PRODUCTS, FETCH_PRODUCTS_BY_SELECTION, FETCH_STORE_BY_KEY,
};
use super::types::{
    ProductByIdData, ProductNode, ProductSelectionData, ProductsData, StoreData, StoreNode,
    Variant,
};

// =============================================================================
// Variables
// =============================================================================

#[derive(Debug, Serialize)]
struct ProductsVariables {
    #[serde(rename = "where")]
    where_clause: Option<String>,
    sort: Vec<String>,
    limit: u32,
    offset: u32,
}

#[derive(Debug, Serialize)]
struct IdVariables<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct SelectionVariables<'a> {
    id: &'a str,
    limit: u32,
    offset: u32,
}

#[derive(Debug, Serialize)]
struct KeyVariables<'a> {
    key: &'a str,
}

// =============================================================================
// Domain Types
// =============================================================================

/// Products assigned to one product selection.
#[derive(Debug, Clone)]
pub struct SelectionProducts {
    pub id: String,
    pub key: Option<String>,
    pub name_all_locales: Vec<LocalizedString>,
    pub products: PagedResult<ProductNode>,
}

impl SelectionProducts {
    #[must_use]
    pub fn name(&self, locale: &str) -> &str {
        localized_value(&self.name_all_locales, locale)
            .or(self.key.as_deref())
            .unwrap_or(&self.id)
    }
}

/// A product as a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub product_type: String,
    pub price: String,
    pub provider: String,
    pub published: bool,
    pub created_at: String,
    pub last_modified_at: String,
}

impl ProductSummary {
    #[must_use]
    pub fn from_node(node: &ProductNode, config: &DisplayConfig) -> Self {
        let placeholder = || config.placeholder.clone();
        let variant = node.master_variant();

        Self {
            id: node.id.clone(),
            name: node
                .name(&config.locale)
                .map_or_else(placeholder, str::to_string),
            sku: variant
                .and_then(|v| v.sku.clone())
                .or_else(|| node.key.clone())
                .unwrap_or_else(placeholder),
            product_type: node
                .product_type
                .as_ref()
                .map_or_else(placeholder, |t| t.name.clone()),
            price: variant
                .and_then(Variant::first_price)
                .map_or_else(placeholder, super::types::Money::display),
            provider: variant
                .and_then(|v| v.attribute(PROVIDER_ATTRIBUTE))
                .and_then(enum_key)
                .unwrap_or_else(placeholder),
            published: node.master_data.published,
            created_at: format_iso_timestamp(&node.created_at, config),
            last_modified_at: format_iso_timestamp(&node.last_modified_at, config),
        }
    }
}

/// A product with its variants, for the detail page.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub id: String,
    pub key: String,
    pub version: i64,
    pub name: String,
    pub description: String,
    pub slug: String,
    pub product_type: String,
    pub published: bool,
    pub has_staged_changes: bool,
    pub categories: Vec<String>,
    pub variants: Vec<VariantDetail>,
    pub created_at: String,
    pub last_modified_at: String,
}

#[derive(Debug, Clone)]
pub struct VariantDetail {
    pub id: i64,
    pub sku: String,
    pub key: String,
    pub is_master: bool,
    pub prices: Vec<String>,
    pub attributes: Vec<(String, String)>,
}

impl ProductDetail {
    /// Build the detail view. Category names come from the product itself and
    /// fall back to the loaded category index, then to the raw id.
    #[must_use]
    pub fn from_node(node: &ProductNode, categories: &ReferenceIndex, config: &DisplayConfig) -> Self {
        let locale = config.locale.as_str();
        let placeholder = || config.placeholder.clone();
        let current = node.master_data.current.as_ref();
        let localized = |names: &[LocalizedString]| {
            localized_value(names, locale).map_or_else(placeholder, str::to_string)
        };

        let variants = current
            .map(|c| {
                std::iter::once((&c.master_variant, true))
                    .chain(c.variants.iter().map(|v| (v, false)))
                    .map(|(v, is_master)| VariantDetail::from_variant(v, is_master, config))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: node.id.clone(),
            key: node.key.clone().unwrap_or_else(placeholder),
            version: node.version,
            name: current.map_or_else(placeholder, |c| localized(&c.name_all_locales)),
            description: current
                .and_then(|c| c.description_all_locales.as_deref())
                .map_or_else(placeholder, |names| localized(names)),
            slug: current.map_or_else(placeholder, |c| localized(&c.slug_all_locales)),
            product_type: node
                .product_type
                .as_ref()
                .map_or_else(placeholder, |t| t.name.clone()),
            published: node.master_data.published,
            has_staged_changes: node.master_data.has_staged_changes,
            categories: current
                .map(|c| {
                    c.categories
                        .iter()
                        .map(|category| {
                            if category.name_all_locales.is_empty() {
                                categories.label(&category.id, locale).to_string()
                            } else {
                                category.label(locale).to_string()
                            }
                        })
                        .collect()
                })
                .unwrap_or_default(),
            variants,
            created_at: format_iso_timestamp(&node.created_at, config),
            last_modified_at: format_iso_timestamp(&node.last_modified_at, config),
        }
    }
}

impl VariantDetail {
    fn from_variant(variant: &Variant, is_master: bool, config: &DisplayConfig) -> Self {
        Self {
            id: variant.id,
            sku: variant
                .sku
                .clone()
                .unwrap_or_else(|| config.placeholder.clone()),
            key: variant
                .key
                .clone()
                .unwrap_or_else(|| config.placeholder.clone()),
            is_master,
            prices: variant
                .prices
                .iter()
                .flatten()
                .map(|price| match &price.channel {
                    Some(channel) => format!("{} ({})", price.value.display(), channel.id),
                    None => price.value.display(),
                })
                .collect(),
            attributes: variant
                .attributes_raw
                .iter()
                .map(|attr| (attr.name.clone(), attribute_display(&attr.value, &config.locale)))
                .collect(),
        }
    }
}

/// Key of an enum attribute value. Accepts a plain string, an `{key, label}`
/// object or a set of them (first entry).
fn enum_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("key").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => items.first().and_then(enum_key),
        _ => None,
    }
}

/// Human-readable rendering of a raw attribute value.
fn attribute_display(value: &Value, locale: &str) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| attribute_display(item, locale))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => {
            if let Some(label) = map.get("label") {
                return match label {
                    Value::Object(names) => names
                        .get(locale)
                        .or_else(|| names.values().next())
                        .map_or_else(String::new, |v| attribute_display(v, locale)),
                    other => attribute_display(other, locale),
                };
            }
            if let (Some(amount), Some(currency)) = (
                map.get("centAmount").and_then(Value::as_i64),
                map.get("currencyCode").and_then(Value::as_str),
            ) {
                let digits = map
                    .get("fractionDigits")
                    .and_then(Value::as_u64)
                    .and_then(|d| u32::try_from(d).ok())
                    .unwrap_or(2);
                return format!("{currency} {}", rust_decimal::Decimal::new(amount, digits));
            }
            if let Some(localized) = map.get(locale) {
                return attribute_display(localized, locale);
            }
            map.get("key")
                .or_else(|| map.get("id"))
                .map_or_else(|| value.to_string(), |v| attribute_display(v, locale))
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

impl CommercetoolsClient {
    /// One page of products matching a predicate.
    ///
    /// # Errors
    ///
    /// Returns `CommercetoolsError` if the API call fails.
    #[instrument(skip(self))]
    pub async fn query_products(
        &self,
        where_clause: Option<String>,
        sort: &SortSpec,
        page: PageRequest,
    ) -> Result<PagedResult<ProductNode>, CommercetoolsError> {
        let variables = ProductsVariables {
            where_clause,
            sort: vec![sort.to_string()],
            limit: page.limit(),
            offset: page.offset(),
        };

        let data: ProductsData = self.execute("FetchProducts", FETCH_PRODUCTS, variables).await?;
        Ok(data.products.into())
    }

    /// Products in any of the given categories. No categories, no products.
    ///
    /// # Errors
    ///
    /// Returns `CommercetoolsError` if the API call fails.
    pub async fn products_in_categories(
        &self,
        categories: &[CategoryId],
        sort: &SortSpec,
        page: PageRequest,
    ) -> Result<PagedResult<ProductNode>, CommercetoolsError> {
        let Some(predicate) = products_in_categories(categories) else {
            return Ok(PagedResult::empty());
        };
        self.query_products(Some(predicate), sort, page).await
    }

    /// Products whose master variant carries the given provider key.
    ///
    /// # Errors
    ///
    /// Returns `CommercetoolsError` if the API call fails.
    pub async fn products_by_provider(
        &self,
        provider_key: &str,
        sort: &SortSpec,
        page: PageRequest,
    ) -> Result<PagedResult<ProductNode>, CommercetoolsError> {
        if provider_key.trim().is_empty() {
            return Ok(PagedResult::empty());
        }
        self.query_products(Some(products_by_provider(provider_key)), sort, page)
            .await
    }

    /// Products assigned to a product selection; `None` if the selection
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CommercetoolsError` if the API call fails.
    #[instrument(skip(self))]
    pub async fn products_in_selection(
        &self,
        selection_id: &str,
        page: PageRequest,
    ) -> Result<Option<SelectionProducts>, CommercetoolsError> {
        let variables = SelectionVariables {
            id: selection_id,
            limit: page.limit(),
            offset: page.offset(),
        };

        let data: ProductSelectionData = self
            .execute("FetchProductsBySelection", FETCH_PRODUCTS_BY_SELECTION, variables)
            .await?;

        Ok(data.product_selection.map(|selection| {
            let refs = selection.product_refs;
            // Assignments whose product is no longer readable are skipped.
            let results: Vec<ProductNode> =
                refs.results.into_iter().filter_map(|r| r.product).collect();
            SelectionProducts {
                id: selection.id,
                key: selection.key,
                name_all_locales: selection.name_all_locales,
                products: PagedResult {
                    total: refs.total,
                    count: results.len() as u64,
                    offset: refs.offset,
                    results,
                },
            }
        }))
    }

    /// A store with its product selection assignments.
    ///
    /// # Errors
    ///
    /// Returns `CommercetoolsError` if the API call fails.
    #[instrument(skip(self))]
    pub async fn store_by_key(&self, key: &str) -> Result<Option<StoreNode>, CommercetoolsError> {
        let data: StoreData = self
            .execute("FetchStoreByKey", FETCH_STORE_BY_KEY, KeyVariables { key })
            .await?;
        Ok(data.store)
    }

    /// Products of a store: those in its first active product selection.
    ///
    /// # Errors
    ///
    /// Returns `CommercetoolsError::NotFound` if the store does not exist.
    pub async fn products_in_store(
        &self,
        store_key: &str,
        page: PageRequest,
    ) -> Result<Option<SelectionProducts>, CommercetoolsError> {
        let store = self
            .store_by_key(store_key)
            .await?
            .ok_or_else(|| CommercetoolsError::NotFound(format!("store {store_key}")))?;

        let Some(selection_id) = store.first_selection_id() else {
            tracing::debug!(store = store_key, "store has no active product selection");
            return Ok(None);
        };

        self.products_in_selection(selection_id, page).await
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `CommercetoolsError` if the API call fails.
    #[instrument(skip(self))]
    pub async fn product(&self, id: &str) -> Result<Option<ProductNode>, CommercetoolsError> {
        let result: Result<ProductByIdData, _> = self
            .execute("FetchProductById", FETCH_PRODUCT_BY_ID, IdVariables { id })
            .await;

        match result {
            Ok(data) => Ok(data.product),
            Err(CommercetoolsError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
