//! Search backends.
//!
//! A backend receives a fully pre-processed [`Query`] and fills its result
//! set through [`Query::results_mut`]. It never post-processes or caches;
//! the query does that itself once the backend returns.

pub mod memory;

use std::fmt::Debug;

use crate::error::Result;
use crate::query::Query;

/// Trait for the servers executing searches.
pub trait SearchBackend: Send + Sync + Debug {
    /// Get the name of this backend.
    fn name(&self) -> &'static str;

    /// Whether the backend supports an optional feature, e.g.
    /// `"search_api_language"`.
    fn supports_feature(&self, feature: &str) -> bool {
        let _ = feature;
        false
    }

    /// Run the search and populate `query.results_mut()`.
    fn search(&self, query: &mut Query) -> Result<()>;
}
