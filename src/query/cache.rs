//! Request-scoped cache of executed result sets.
//!
//! Queries store their result set here as the last step of post-processing,
//! including on aborted paths. Consumers (blocks, facets, pagers) read them
//! back by query id or by search id.

use std::fmt::Debug;

use ahash::AHashMap;
use log::trace;
use parking_lot::RwLock;

use crate::query::query::QueryId;
use crate::query::results::ResultSet;

/// Storage for the most recent results of each query.
pub trait ResultsCache: Send + Sync + Debug {
    /// Store (or overwrite) the results of their owning query.
    fn add_results(&self, results: &ResultSet);

    /// Get the last results stored for a query.
    fn get_results(&self, query_id: &QueryId) -> Option<ResultSet>;

    /// Get the results of the most recently stored query under a search id
    /// that is still cached.
    fn get_results_for_search(&self, search_id: &str) -> Option<ResultSet>;

    /// Forget the results of a query.
    fn remove_results(&self, query_id: &QueryId);

    /// Forget everything.
    fn clear(&self);
}

#[derive(Debug, Default)]
struct CacheEntries {
    by_query: AHashMap<QueryId, ResultSet>,
    // Queries per search id, oldest first.
    by_search: AHashMap<String, Vec<QueryId>>,
}

impl CacheEntries {
    fn forget_search(&mut self, query_id: &QueryId) {
        self.by_search.retain(|_, ids| {
            ids.retain(|id| id != query_id);
            !ids.is_empty()
        });
    }
}

/// In-process [`ResultsCache`] without eviction.
#[derive(Debug, Default)]
pub struct StaticResultsCache {
    entries: RwLock<CacheEntries>,
}

impl StaticResultsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().by_query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultsCache for StaticResultsCache {
    fn add_results(&self, results: &ResultSet) {
        trace!(
            "caching results of query {} (search id '{}')",
            results.query_id(),
            results.search_id()
        );
        let mut guard = self.entries.write();
        let query_id = results.query_id();
        guard.forget_search(&query_id);
        guard
            .by_search
            .entry(results.search_id().to_string())
            .or_default()
            .push(query_id);
        guard.by_query.insert(query_id, results.clone());
    }

    fn get_results(&self, query_id: &QueryId) -> Option<ResultSet> {
        self.entries.read().by_query.get(query_id).cloned()
    }

    fn get_results_for_search(&self, search_id: &str) -> Option<ResultSet> {
        let guard = self.entries.read();
        guard
            .by_search
            .get(search_id)?
            .iter()
            .rev()
            .find_map(|id| guard.by_query.get(id))
            .cloned()
    }

    fn remove_results(&self, query_id: &QueryId) {
        let mut guard = self.entries.write();
        guard.by_query.remove(query_id);
        guard.forget_search(query_id);
    }

    fn clear(&self) {
        let mut guard = self.entries.write();
        guard.by_query.clear();
        guard.by_search.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::results::ResultItem;

    #[test]
    fn test_add_and_get() {
        let cache = StaticResultsCache::new();
        let id = QueryId::new();
        let mut results = ResultSet::new(id, "search_page".to_string());
        results.add_result_item(ResultItem::new("1"));

        cache.add_results(&results);

        assert_eq!(cache.get_results(&id), Some(results.clone()));
        assert_eq!(cache.get_results_for_search("search_page"), Some(results));
        assert!(cache.get_results(&QueryId::new()).is_none());
    }

    #[test]
    fn test_overwrite_and_latest_per_search() {
        let cache = StaticResultsCache::new();
        let first = ResultSet::new(QueryId::new(), "views".to_string());
        let second = ResultSet::new(QueryId::new(), "views".to_string());

        cache.add_results(&first);
        cache.add_results(&second);

        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.get_results_for_search("views").unwrap().query_id(),
            second.query_id()
        );
    }

    #[test]
    fn test_removing_latest_falls_back_to_older_query() {
        let cache = StaticResultsCache::new();
        let older = ResultSet::new(QueryId::new(), "views".to_string());
        let newer = ResultSet::new(QueryId::new(), "views".to_string());
        cache.add_results(&older);
        cache.add_results(&newer);

        cache.remove_results(&newer.query_id());
        assert_eq!(
            cache.get_results_for_search("views").unwrap().query_id(),
            older.query_id()
        );

        // Re-storing a query makes it the latest again.
        cache.add_results(&newer);
        cache.add_results(&older);
        assert_eq!(
            cache.get_results_for_search("views").unwrap().query_id(),
            older.query_id()
        );

        cache.remove_results(&older.query_id());
        cache.remove_results(&newer.query_id());
        assert!(cache.get_results_for_search("views").is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = StaticResultsCache::new();
        let results = ResultSet::new(QueryId::new(), "s".to_string());
        cache.add_results(&results);

        cache.remove_results(&results.query_id());
        assert!(cache.get_results_for_search("s").is_none());

        cache.add_results(&results);
        cache.clear();
        assert!(cache.is_empty());
    }
}
