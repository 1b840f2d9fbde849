//! Query and result processors.
//!
//! Processors are attached to an index through a [`ProcessorChain`]. During
//! pre-processing each processor may alter the query (keys, conditions,
//! options); during post-processing each may alter the result set. Within a
//! stage, processors run by ascending weight, ties in the order they were
//! added.
//!
//! # Available Processors
//!
//! - [`ignore_case::IgnoreCase`] - Lowercases search keys
//! - [`ignore_characters::IgnoreCharacters`] - Strips configured characters
//!   from search keys
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use halberd::processor::ProcessorChain;
//! use halberd::processor::ignore_case::IgnoreCase;
//! use halberd::processor::ignore_characters::IgnoreCharacters;
//!
//! let chain = ProcessorChain::new()
//!     .add_processor(Arc::new(IgnoreCase::new()))
//!     .add_processor(Arc::new(IgnoreCharacters::punctuation().unwrap()));
//! assert_eq!(chain.len(), 2);
//! ```

pub mod ignore_case;
pub mod ignore_characters;

use std::fmt::Debug;
use std::sync::Arc;

use log::trace;

use crate::error::Result;
use crate::query::{Query, ResultSet};

/// Processing stages a processor can take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorStage {
    PreprocessQuery,
    PostprocessQuery,
}

/// Trait for processors hooked into query execution.
///
/// # Examples
///
/// ```
/// use halberd::error::Result;
/// use halberd::processor::{Processor, ProcessorStage};
/// use halberd::query::ResultSet;
///
/// #[derive(Debug)]
/// struct Truncate(usize);
///
/// impl Processor for Truncate {
///     fn name(&self) -> &'static str {
///         "truncate"
///     }
///
///     fn supports_stage(&self, stage: ProcessorStage) -> bool {
///         stage == ProcessorStage::PostprocessQuery
///     }
///
///     fn postprocess_search_results(&self, results: &mut ResultSet) -> Result<()> {
///         results.result_items_mut().truncate(self.0);
///         Ok(())
///     }
/// }
/// ```
pub trait Processor: Send + Sync + Debug {
    /// Get the name of this processor.
    fn name(&self) -> &'static str;

    /// Whether this processor runs in the given stage.
    fn supports_stage(&self, stage: ProcessorStage) -> bool {
        let _ = stage;
        true
    }

    /// Ordering within a stage; lower runs first.
    fn weight(&self, stage: ProcessorStage) -> i32 {
        let _ = stage;
        0
    }

    /// Alter a query before it reaches the backend.
    fn preprocess_search_query(&self, query: &mut Query) -> Result<()> {
        let _ = query;
        Ok(())
    }

    /// Alter the results returned by the backend.
    fn postprocess_search_results(&self, results: &mut ResultSet) -> Result<()> {
        let _ = results;
        Ok(())
    }
}

/// Ordered collection of processors.
#[derive(Debug, Clone, Default)]
pub struct ProcessorChain {
    processors: Vec<Arc<dyn Processor>>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a processor to the chain.
    pub fn add_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn processors(&self) -> &[Arc<dyn Processor>] {
        &self.processors
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Processors taking part in a stage, in execution order.
    pub fn for_stage(&self, stage: ProcessorStage) -> Vec<Arc<dyn Processor>> {
        let mut selected: Vec<Arc<dyn Processor>> = self
            .processors
            .iter()
            .filter(|p| p.supports_stage(stage))
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal weights.
        selected.sort_by_key(|p| p.weight(stage));
        selected
    }

    pub fn preprocess_search_query(&self, query: &mut Query) -> Result<()> {
        for processor in self.for_stage(ProcessorStage::PreprocessQuery) {
            trace!("preprocessing query {} with '{}'", query.id(), processor.name());
            processor.preprocess_search_query(query)?;
        }
        Ok(())
    }

    pub fn postprocess_search_results(&self, results: &mut ResultSet) -> Result<()> {
        for processor in self.for_stage(ProcessorStage::PostprocessQuery) {
            trace!(
                "postprocessing results of query {} with '{}'",
                results.query_id(),
                processor.name()
            );
            processor.postprocess_search_results(results)?;
        }
        Ok(())
    }
}
