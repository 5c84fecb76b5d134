//! Label resolution of user id lists against reference collections.
//!
//! A user record stores bare ids for its provider channels, categories and
//! product selections. Rendering a row needs human-readable labels, so each
//! id is looked up in the matching reference collection and turned into a
//! label with the fallback chain of [`ReferenceEntity::label`]:
//! exact locale, first locale, key, raw id.
//!
//! Ids with no matching entity are shown as the raw id. That happens when the
//! entity was deleted or when the collection is larger than its page cap
//! (see [`ReferenceKind::page_cap`]); neither is an error.

use std::collections::HashMap;

use crate::DisplayConfig;
use crate::types::{PagedResult, ReferenceEntity, ReferenceKind, UserValue};

/// Separator between labels of one list.
pub const LABEL_SEPARATOR: &str = ", ";

/// The fixed element type ids and their labels.
pub const ELEMENT_TYPE_LABELS: &[(&str, &str)] = &[
    ("f&b", "Comida y Bebida"),
    ("vip", "Servicios VIP"),
    ("merchandising", "Merchandising"),
];

/// An id-indexed reference collection.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    entities: Vec<ReferenceEntity>,
    by_id: HashMap<String, usize>,
    truncated: bool,
}

impl ReferenceIndex {
    /// Index a loaded page of reference entities.
    ///
    /// If an id appears twice the first entry wins.
    #[must_use]
    pub fn new(page: PagedResult<ReferenceEntity>) -> Self {
        let truncated = page.is_truncated();
        let entities = page.results;
        let mut by_id = HashMap::with_capacity(entities.len());
        for (position, entity) in entities.iter().enumerate() {
            by_id.entry(entity.id.clone()).or_insert(position);
        }
        Self {
            entities,
            by_id,
            truncated,
        }
    }

    /// Index a complete list.
    #[must_use]
    pub fn from_entities(entities: Vec<ReferenceEntity>) -> Self {
        Self::new(PagedResult::from_all(entities))
    }

    /// Look up an entity by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ReferenceEntity> {
        self.by_id
            .get(id)
            .and_then(|&position| self.entities.get(position))
    }

    /// Label for one id; the id itself when absent.
    #[must_use]
    pub fn label<'a>(&'a self, id: &'a str, locale: &str) -> &'a str {
        self.get(id).map_or(id, |entity| entity.label(locale))
    }

    /// Labels for a list of ids joined with `", "`, in id order.
    #[must_use]
    pub fn join_labels(&self, ids: &[String], locale: &str) -> String {
        ids.iter()
            .map(|id| self.label(id, locale))
            .collect::<Vec<_>>()
            .join(LABEL_SEPARATOR)
    }

    /// Entities in load order, for option lists.
    #[must_use]
    pub fn entities(&self) -> &[ReferenceEntity] {
        &self.entities
    }

    /// Whether the collection had more entries than were loaded.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// The reference collections a user row depends on.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    pub channels: ReferenceIndex,
    pub categories: ReferenceIndex,
    pub product_selections: ReferenceIndex,
    pub stores: ReferenceIndex,
}

impl ReferenceSet {
    /// The index for a reference kind.
    #[must_use]
    pub const fn get(&self, kind: ReferenceKind) -> &ReferenceIndex {
        match kind {
            ReferenceKind::Channel => &self.channels,
            ReferenceKind::Category => &self.categories,
            ReferenceKind::ProductSelection => &self.product_selections,
            ReferenceKind::Store => &self.stores,
        }
    }

    /// Resolve every id list of a user value.
    #[must_use]
    pub fn resolve(&self, value: &UserValue, config: &DisplayConfig) -> ResolvedLabels {
        let locale = config.locale.as_str();
        ResolvedLabels {
            providers: self.channels.join_labels(&value.provider_ids, locale),
            categories: self.categories.join_labels(&value.category_ids, locale),
            product_selections: self
                .product_selections
                .join_labels(&value.product_selection_ids, locale),
            element_types: element_type_labels(&value.element_type_ids),
        }
    }
}

/// Joined labels for each id list of a user. Empty lists give empty strings;
/// the caller decides what to show instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedLabels {
    pub providers: String,
    pub categories: String,
    pub product_selections: String,
    pub element_types: String,
}

/// Label for one element type id; unknown ids pass through.
#[must_use]
pub fn element_type_label(id: &str) -> &str {
    ELEMENT_TYPE_LABELS
        .iter()
        .find(|(known, _)| *known == id)
        .map_or(id, |(_, label)| label)
}

fn element_type_labels(ids: &[String]) -> String {
    ids.iter()
        .map(|id| element_type_label(id))
        .collect::<Vec<_>>()
        .join(LABEL_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    fn channels() -> ReferenceIndex {
        ReferenceIndex::from_entities(vec![
            ReferenceEntity::new("c1").with_name("es", "Store A"),
        ])
    }

    #[test]
    fn test_found_and_missing_ids_keep_order() {
        let index = channels();
        assert_eq!(index.join_labels(&ids(&["c1", "c2"]), "es"), "Store A, c2");
        assert_eq!(index.join_labels(&ids(&["c2", "c1"]), "es"), "c2, Store A");
    }

    #[test]
    fn test_missing_id_resolves_to_itself() {
        let index = ReferenceIndex::default();
        assert_eq!(index.label("unknown-id", "es"), "unknown-id");
    }

    #[test]
    fn test_empty_list_is_empty_string() {
        assert_eq!(channels().join_labels(&[], "es"), "");
    }

    #[test]
    fn test_locale_fallback_to_first_entry() {
        let index = ReferenceIndex::from_entities(vec![
            ReferenceEntity::new("cat")
                .with_name("es", "Ropa")
                .with_name("en", "Clothes"),
        ]);
        assert_eq!(index.label("cat", "fr"), "Ropa");
        assert_eq!(index.label("cat", "en"), "Clothes");
    }

    #[test]
    fn test_same_chain_for_every_list() {
        let entity = |id: &str| {
            ReferenceEntity::new(id)
                .with_key(format!("{id}-key"))
                .with_name("en", format!("{id} en"))
        };
        let set = ReferenceSet {
            channels: ReferenceIndex::from_entities(vec![entity("p")]),
            categories: ReferenceIndex::from_entities(vec![entity("c")]),
            product_selections: ReferenceIndex::from_entities(vec![entity("s")]),
            stores: ReferenceIndex::default(),
        };
        let value = UserValue {
            provider_ids: ids(&["p", "x"]),
            category_ids: ids(&["c", "y"]),
            product_selection_ids: ids(&["s", "z"]),
            element_type_ids: ids(&["vip", "other"]),
            ..UserValue::default()
        };

        let labels = set.resolve(&value, &DisplayConfig::new("de"));
        assert_eq!(labels.providers, "p en, x");
        assert_eq!(labels.categories, "c en, y");
        assert_eq!(labels.product_selections, "s en, z");
        assert_eq!(labels.element_types, "Servicios VIP, other");
    }

    #[test]
    fn test_duplicate_ids_first_wins() {
        let index = ReferenceIndex::from_entities(vec![
            ReferenceEntity::new("c1").with_key("first"),
            ReferenceEntity::new("c1").with_key("second"),
        ]);
        assert_eq!(index.label("c1", "es"), "first");
    }

    #[test]
    fn test_truncated_page_is_flagged() {
        let index = ReferenceIndex::new(PagedResult {
            total: 501,
            count: 1,
            offset: 0,
            results: vec![ReferenceEntity::new("c1")],
        });
        assert!(index.is_truncated());
        assert_eq!(index.label("c999", "es"), "c999");
    }
}
