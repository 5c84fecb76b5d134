//! Localized names and read-only reference entities.

use core::fmt;

use serde::{Deserialize, Serialize};

/// One localized candidate for a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedString {
    /// Locale tag, e.g. `es` or `en-US`.
    pub locale: String,
    /// Text in that locale.
    pub value: String,
}

impl LocalizedString {
    /// Create a localized string.
    #[must_use]
    pub fn new(locale: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            value: value.into(),
        }
    }
}

/// Pick the name for `locale`, falling back to the first available name.
///
/// Returns `None` only when `names` is empty. Empty values count as absent.
#[must_use]
pub fn localized_value<'a>(names: &'a [LocalizedString], locale: &str) -> Option<&'a str> {
    names
        .iter()
        .find(|name| name.locale == locale && !name.value.is_empty())
        .or_else(|| names.iter().find(|name| !name.value.is_empty()))
        .map(|name| name.value.as_str())
}

/// The kinds of reference collections loaded for label resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    Channel,
    Category,
    ProductSelection,
    Store,
}

impl ReferenceKind {
    /// All reference kinds, in load order.
    pub const ALL: [Self; 4] = [
        Self::Channel,
        Self::Category,
        Self::ProductSelection,
        Self::Store,
    ];

    /// Maximum number of entries fetched for this collection.
    ///
    /// Collections are loaded as a single unfiltered page. Entries beyond the
    /// cap are not available to the resolver and render as raw ids.
    #[must_use]
    pub const fn page_cap(self) -> u32 {
        match self {
            Self::Channel | Self::Category | Self::ProductSelection => 500,
            Self::Store => 100,
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Channel => "channels",
            Self::Category => "categories",
            Self::ProductSelection => "product-selections",
            Self::Store => "stores",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ReferenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "channel" | "channels" => Ok(Self::Channel),
            "category" | "categories" => Ok(Self::Category),
            "product-selection" | "product-selections" => Ok(Self::ProductSelection),
            "store" | "stores" => Ok(Self::Store),
            other => Err(format!("unknown reference kind: {other}")),
        }
    }
}

/// A channel, category, product selection or store, as read from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntity {
    /// Stable platform id.
    pub id: String,
    /// Optional human-readable key.
    #[serde(default)]
    pub key: Option<String>,
    /// Localized display name candidates, in platform order.
    #[serde(default)]
    pub name_all_locales: Vec<LocalizedString>,
}

impl ReferenceEntity {
    /// Create a reference entity with no key and no names.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: None,
            name_all_locales: Vec::new(),
        }
    }

    /// Set the key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Append a localized name.
    #[must_use]
    pub fn with_name(mut self, locale: impl Into<String>, value: impl Into<String>) -> Self {
        self.name_all_locales.push(LocalizedString::new(locale, value));
        self
    }

    /// Display label: locale match, then first name, then key, then id.
    #[must_use]
    pub fn label(&self, locale: &str) -> &str {
        localized_value(&self.name_all_locales, locale)
            .or_else(|| self.key.as_deref().filter(|key| !key.is_empty()))
            .unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prefers_exact_locale() {
        let entity = ReferenceEntity::new("cat-1")
            .with_key("clothes")
            .with_name("en", "Clothes")
            .with_name("es", "Ropa");
        assert_eq!(entity.label("es"), "Ropa");
        assert_eq!(entity.label("en"), "Clothes");
    }

    #[test]
    fn test_label_falls_back_to_first_locale_not_best_guess() {
        let entity = ReferenceEntity::new("cat-1")
            .with_name("es", "Ropa")
            .with_name("en", "Clothes");
        assert_eq!(entity.label("fr"), "Ropa");
    }

    #[test]
    fn test_label_falls_back_to_key_then_id() {
        let keyed = ReferenceEntity::new("ch-1").with_key("store-a");
        assert_eq!(keyed.label("es"), "store-a");

        let bare = ReferenceEntity::new("ch-2");
        assert_eq!(bare.label("es"), "ch-2");

        let empty_key = ReferenceEntity::new("ch-3").with_key("");
        assert_eq!(empty_key.label("es"), "ch-3");
    }

    #[test]
    fn test_reference_kind_caps() {
        assert_eq!(ReferenceKind::Channel.page_cap(), 500);
        assert_eq!(ReferenceKind::Category.page_cap(), 500);
        assert_eq!(ReferenceKind::ProductSelection.page_cap(), 500);
        assert_eq!(ReferenceKind::Store.page_cap(), 100);
    }

    #[test]
    fn test_reference_kind_parse() {
        assert_eq!(
            "product-selections".parse::<ReferenceKind>(),
            Ok(ReferenceKind::ProductSelection)
        );
        assert!("widgets".parse::<ReferenceKind>().is_err());
    }

    #[test]
    fn test_deserialize_platform_shape() {
        let json = r#"{"id":"c1","key":"k1","nameAllLocales":[{"locale":"es","value":"Tienda"}]}"#;
        let entity: ReferenceEntity = serde_json::from_str(json).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(entity.label("es"), "Tienda");
    }
}
