//! Session-scoped memo of city search results.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::fold::fold_key;
use crate::types::RankedPlaceResult;

/// Keyed by folded base query, country hint and requested count. Lives as
/// long as the owning geocoder; nothing is persisted.
#[derive(Debug, Default)]
pub struct SearchCache {
    entries: Mutex<HashMap<String, Vec<RankedPlaceResult>>>,
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyed on what actually goes upstream: `"santiago chile"` and
    /// `"Santiago, Chile"` both become base `"santiago"` with hint `CL`.
    pub fn key(base_query: &str, hint_code: Option<&str>, count: usize) -> String {
        format!("{}|{}|{}", fold_key(base_query), hint_code.unwrap_or(""), count)
    }

    pub fn get(&self, key: &str) -> Option<Vec<RankedPlaceResult>> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert(&self, key: String, results: Vec<RankedPlaceResult>) {
        self.entries.lock().insert(key, results);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_normalizes_query() {
        assert_eq!(
            SearchCache::key("  São  Paulo ", None, 5),
            SearchCache::key("sao paulo", None, 5)
        );
        assert_ne!(
            SearchCache::key("sao paulo", None, 5),
            SearchCache::key("sao paulo", None, 10)
        );
    }

    #[test]
    fn key_separates_hinted_searches() {
        assert_ne!(
            SearchCache::key("santiago", Some("CL"), 5),
            SearchCache::key("santiago", None, 5)
        );
        assert_ne!(
            SearchCache::key("santiago", Some("CL"), 5),
            SearchCache::key("santiago", Some("ES"), 5)
        );
    }

    #[test]
    fn insert_get_clear() {
        let cache = SearchCache::new();
        assert!(cache.get("x|5").is_none());
        cache.insert("x|5".into(), Vec::new());
        assert_eq!(cache.get("x|5"), Some(Vec::new()));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
