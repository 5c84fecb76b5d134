//! GraphQL documents sent to the commercetools API.
//!
//! Each constant is one operation; its name matches the `operationName`
//! passed to [`super::CommercetoolsClient::execute`]. Responses are decoded
//! into the types in [`super::types`].

// =============================================================================
// Reference collections
// =============================================================================

pub const FETCH_CHANNELS: &str = r"
query FetchChannels($limit: Int!, $sort: [String!]) {
  page: channels(limit: $limit, sort: $sort) {
    total
    count
    offset
    results {
      id
      key
      nameAllLocales { locale value }
    }
  }
}";

pub const FETCH_CATEGORIES: &str = r"
query FetchCategories($limit: Int!, $sort: [String!]) {
  page: categories(limit: $limit, sort: $sort) {
    total
    count
    offset
    results {
      id
      key
      nameAllLocales { locale value }
    }
  }
}";

pub const FETCH_PRODUCT_SELECTIONS: &str = r"
query FetchProductSelections($limit: Int!, $sort: [String!]) {
  page: productSelections(limit: $limit, sort: $sort) {
    total
    count
    offset
    results {
      id
      key
      nameAllLocales { locale value }
    }
  }
}";

pub const FETCH_STORES: &str = r"
query FetchStores($limit: Int!, $sort: [String!]) {
  page: stores(limit: $limit, sort: $sort) {
    total
    count
    offset
    results {
      id
      key
      nameAllLocales { locale value }
    }
  }
}";

pub const FETCH_STORE_BY_KEY: &str = r"
query FetchStoreByKey($key: String!) {
  store(key: $key) {
    id
    key
    nameAllLocales { locale value }
    productSelections {
      active
      productSelection { id }
    }
  }
}";

// =============================================================================
// Custom objects
// =============================================================================

pub const FETCH_CUSTOM_OBJECTS: &str = r"
query FetchCustomObjects(
  $container: String!
  $where: String
  $sort: [String!]
  $limit: Int!
  $offset: Int!
) {
  customObjects(
    container: $container
    where: $where
    sort: $sort
    limit: $limit
    offset: $offset
  ) {
    total
    count
    offset
    results {
      id
      key
      version
      value
    }
  }
}";

pub const FETCH_CUSTOM_OBJECT_BY_KEY: &str = r"
query FetchCustomObjectByKey($container: String!, $key: String!) {
  customObject(container: $container, key: $key) {
    id
    key
    version
    value
  }
}";

pub const FETCH_CUSTOM_OBJECT_BY_ID: &str = r"
query FetchCustomObjectById($container: String!, $id: String!) {
  customObject(container: $container, id: $id) {
    id
    key
    version
    value
  }
}";

pub const SAVE_CUSTOM_OBJECT: &str = r"
mutation SaveCustomObject($draft: CustomObjectDraft!) {
  createOrUpdateCustomObject(draft: $draft) {
    id
    key
    version
    value
  }
}";

// =============================================================================
// Products
// =============================================================================

pub const FETCH_PRODUCTS: &str = r"
query FetchProducts($where: String, $sort: [String!], $limit: Int!, $offset: Int!) {
  products(where: $where, sort: $sort, limit: $limit, offset: $offset) {
    total
    count
    offset
    results {
      id
      key
      version
      createdAt
      lastModifiedAt
      productType { key name }
      masterData {
        published
        hasStagedChanges
        current {
          nameAllLocales { locale value }
          masterVariant {
            id
            sku
            key
            prices { value { currencyCode centAmount fractionDigits } }
            attributesRaw { name value }
          }
        }
      }
    }
  }
}";

pub const FETCH_PRODUCT_BY_ID: &str = r"
query FetchProductById($id: String!) {
  product(id: $id) {
    id
    key
    version
    createdAt
    lastModifiedAt
    productType { key name }
    masterData {
      published
      hasStagedChanges
      current {
        nameAllLocales { locale value }
        descriptionAllLocales { locale value }
        slugAllLocales { locale value }
        categories {
          id
          key
          nameAllLocales { locale value }
        }
        masterVariant {
          id
          sku
          key
          prices {
            value { currencyCode centAmount fractionDigits }
            channel { id }
          }
          attributesRaw { name value }
        }
        variants {
          id
          sku
          key
          prices {
            value { currencyCode centAmount fractionDigits }
            channel { id }
          }
          attributesRaw { name value }
        }
      }
    }
  }
}";

pub const FETCH_PRODUCTS_BY_SELECTION: &str = r"
query FetchProductsBySelection($id: String!, $limit: Int!, $offset: Int!) {
  productSelection(id: $id) {
    id
    key
    nameAllLocales { locale value }
    productRefs(limit: $limit, offset: $offset) {
      total
      count
      offset
      results {
        product {
          id
          key
          version
          createdAt
          lastModifiedAt
          productType { key name }
          masterData {
            published
            hasStagedChanges
            current {
              nameAllLocales { locale value }
              masterVariant {
                id
                sku
                key
                prices { value { currencyCode centAmount fractionDigits } }
                attributesRaw { name value }
              }
            }
          }
        }
      }
    }
  }
}";

// =============================================================================
// Orders
// =============================================================================

pub const FETCH_ORDERS: &str = r"
query FetchOrders($where: String, $sort: [String!], $limit: Int!, $offset: Int!) {
  orders(where: $where, sort: $sort, limit: $limit, offset: $offset) {
    total
    count
    offset
    results {
      id
      orderNumber
      customerEmail
      customerId
      orderState
      paymentState
      shipmentState
      totalPrice { currencyCode centAmount fractionDigits }
      createdAt
      lastModifiedAt
    }
  }
}";

pub const FETCH_ORDER_BY_ID: &str = r"
query FetchOrderById($id: String!) {
  order(id: $id) {
    id
    orderNumber
    customerEmail
    customerId
    orderState
    paymentState
    shipmentState
    totalPrice { currencyCode centAmount fractionDigits }
    createdAt
    lastModifiedAt
    lineItems {
      id
      productId
      nameAllLocales { locale value }
      quantity
      variant { sku }
      price { value { currencyCode centAmount fractionDigits } }
      totalPrice { currencyCode centAmount fractionDigits }
      distributionChannel { id }
    }
    shippingAddress {
      firstName lastName streetName streetNumber postalCode city country email phone
    }
    billingAddress {
      firstName lastName streetName streetNumber postalCode city country email phone
    }
  }
}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_match_documents() {
        for (name, document) in [
            ("FetchChannels", FETCH_CHANNELS),
            ("FetchStoreByKey", FETCH_STORE_BY_KEY),
            ("FetchCustomObjects", FETCH_CUSTOM_OBJECTS),
            ("SaveCustomObject", SAVE_CUSTOM_OBJECT),
            ("FetchProducts", FETCH_PRODUCTS),
            ("FetchOrderById", FETCH_ORDER_BY_ID),
        ] {
            assert!(
                document.contains(&format!(" {name}(")),
                "{name} not declared in its document"
            );
        }
    }
}
