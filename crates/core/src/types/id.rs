//! Newtype IDs for type-safe entity references.
//!
//! commercetools identifies every resource with an opaque string id. Use the
//! `define_id!` macro to create wrappers that prevent accidentally mixing ids
//! from different entity types (a channel id is not a category id).

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use vip_admin_core::define_id;
/// define_id!(WarehouseId);
/// define_id!(ShipmentId);
///
/// let warehouse = WarehouseId::new("w-1");
/// let shipment = ShipmentId::new("w-1");
///
/// // These are different types, so this won't compile:
/// // let _: WarehouseId = shipment;
/// assert_eq!(warehouse.as_str(), shipment.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Reference entities (read-only, owned by the platform)
define_id!(ChannelId);
define_id!(CategoryId);
define_id!(ProductSelectionId);
define_id!(StoreId);

// Browsed entities
define_id!(ProductId);
define_id!(OrderId);

/// Id assigned by the platform to a stored custom object.
define_id!(CustomObjectId);
