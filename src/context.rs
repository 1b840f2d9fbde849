//! Shared services a query needs beyond its index.

use std::sync::Arc;

use crate::config::QueryConfig;
use crate::event::EventDispatcher;
use crate::index::IndexRegistry;
use crate::query::{ResultsCache, StaticResultsCache};

/// The running application context.
///
/// Bundles the results cache, the event dispatcher, the index registry used
/// to rehydrate persisted queries, and the query defaults. Cloning is cheap;
/// clones share the same cache, dispatcher and registry.
#[derive(Debug, Clone)]
pub struct SearchContext {
    results_cache: Arc<dyn ResultsCache>,
    events: Arc<EventDispatcher>,
    registry: Option<Arc<dyn IndexRegistry>>,
    config: QueryConfig,
}

impl Default for SearchContext {
    fn default() -> Self {
        SearchContext {
            results_cache: Arc::new(StaticResultsCache::new()),
            events: Arc::new(EventDispatcher::new()),
            registry: None,
            config: QueryConfig::default(),
        }
    }
}

impl SearchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results_cache(mut self, cache: Arc<dyn ResultsCache>) -> Self {
        self.results_cache = cache;
        self
    }

    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = events;
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn IndexRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn results_cache(&self) -> &Arc<dyn ResultsCache> {
        &self.results_cache
    }

    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.events
    }

    pub fn registry(&self) -> Option<&Arc<dyn IndexRegistry>> {
        self.registry.as_ref()
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }
}
