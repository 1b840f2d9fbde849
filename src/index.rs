//! Indexes and the registry used to look them up.
//!
//! An [`Index`] is owned by the host application; a query only holds a
//! shared reference to it and never mutates it. [`SearchIndex`] is the
//! standard implementation: it pairs a backend with a [`ProcessorChain`].

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::SearchBackend;
use crate::error::{HalberdError, Result};
use crate::processor::ProcessorChain;
use crate::query::{Query, ResultSet};

/// A searchable index.
pub trait Index: Send + Sync + Debug {
    /// Machine name of the index.
    fn id(&self) -> &str;

    /// Human-readable label.
    fn label(&self) -> &str;

    /// Whether the index is enabled; disabled indexes cannot be searched.
    fn status(&self) -> bool;

    /// Fulltext fields searched when a query does not restrict them.
    /// Empty means "every text field".
    fn fulltext_fields(&self) -> &[String] {
        &[]
    }

    /// The backend that executes searches on this index.
    fn server(&self) -> Result<Arc<dyn SearchBackend>>;

    /// Run the index's query pre-processing.
    fn preprocess_search_query(&self, query: &mut Query) -> Result<()>;

    /// Run the index's result post-processing.
    fn postprocess_search_results(&self, results: &mut ResultSet) -> Result<()>;
}

/// Lookup of indexes by id, used when rehydrating persisted queries.
pub trait IndexRegistry: Send + Sync + Debug {
    fn load_index(&self, id: &str) -> Option<Arc<dyn Index>>;
}

/// Standard [`Index`] implementation.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    id: String,
    label: String,
    enabled: bool,
    fulltext_fields: Vec<String>,
    server: Option<Arc<dyn SearchBackend>>,
    processors: ProcessorChain,
}

impl SearchIndex {
    /// Create an enabled index without a backend.
    pub fn new<S: Into<String>>(id: S) -> Self {
        let id = id.into();
        SearchIndex {
            label: id.clone(),
            id,
            enabled: true,
            fulltext_fields: Vec::new(),
            server: None,
            processors: ProcessorChain::new(),
        }
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_status(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_server(mut self, server: Arc<dyn SearchBackend>) -> Self {
        self.server = Some(server);
        self
    }

    pub fn with_processors(mut self, processors: ProcessorChain) -> Self {
        self.processors = processors;
        self
    }

    pub fn with_fulltext_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fulltext_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn processors(&self) -> &ProcessorChain {
        &self.processors
    }
}

impl Index for SearchIndex {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn status(&self) -> bool {
        self.enabled
    }

    fn fulltext_fields(&self) -> &[String] {
        &self.fulltext_fields
    }

    fn server(&self) -> Result<Arc<dyn SearchBackend>> {
        self.server.clone().ok_or_else(|| {
            HalberdError::backend(format!("index '{}' has no server configured", self.id))
        })
    }

    fn preprocess_search_query(&self, query: &mut Query) -> Result<()> {
        self.processors.preprocess_search_query(query)
    }

    fn postprocess_search_results(&self, results: &mut ResultSet) -> Result<()> {
        self.processors.postprocess_search_results(results)
    }
}

/// In-memory [`IndexRegistry`].
#[derive(Debug, Default)]
pub struct MemoryIndexRegistry {
    indexes: RwLock<HashMap<String, Arc<dyn Index>>>,
}

impl MemoryIndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an index under its id, replacing any previous one.
    pub fn register(&self, index: Arc<dyn Index>) {
        self.indexes.write().insert(index.id().to_string(), index);
    }

    pub fn remove(&self, id: &str) -> Option<Arc<dyn Index>> {
        self.indexes.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.indexes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IndexRegistry for MemoryIndexRegistry {
    fn load_index(&self, id: &str) -> Option<Arc<dyn Index>> {
        self.indexes.read().get(id).cloned()
    }
}
