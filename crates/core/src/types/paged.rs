//! Paged query results.

use serde::{Deserialize, Serialize};

/// One page of a platform query, as returned by every `*s` query
/// (`{ total, count, offset, results }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Number of matching entries across all pages.
    pub total: u64,
    /// Number of entries in this page.
    pub count: u64,
    /// Offset of the first entry in this page.
    pub offset: u64,
    /// Entries in this page.
    pub results: Vec<T>,
}

impl<T> PagedResult<T> {
    /// An empty page.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            total: 0,
            count: 0,
            offset: 0,
            results: Vec::new(),
        }
    }

    /// Build a page from a complete, unpaged list.
    #[must_use]
    pub fn from_all(results: Vec<T>) -> Self {
        let len = results.len() as u64;
        Self {
            total: len,
            count: len,
            offset: 0,
            results,
        }
    }

    /// Whether entries exist beyond this page.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.offset + self.count < self.total
    }

    /// Map the entries, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            total: self.total,
            count: self.count,
            offset: self.offset,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation() {
        let page = PagedResult {
            total: 600,
            count: 500,
            offset: 0,
            results: vec![(); 500],
        };
        assert!(page.is_truncated());
        assert!(!PagedResult::from_all(vec![1, 2, 3]).is_truncated());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = PagedResult {
            total: 10,
            count: 2,
            offset: 4,
            results: vec![1, 2],
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.results, vec![10, 20]);
        assert_eq!((mapped.total, mapped.count, mapped.offset), (10, 2, 4));
    }
}
