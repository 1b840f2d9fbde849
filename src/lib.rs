//! # Halberd
//!
//! A search query pipeline: build a query against an index, run it through
//! pluggable processors and listeners, hand it to a backend and cache the
//! results.
//!
//! ## Features
//!
//! - Keyword parsing (direct, single phrase, terms with quoted phrases)
//! - Nested AND/OR condition groups
//! - Processor chains and tagged event listeners around execution
//! - Results cache shared across queries
//! - Serializable queries that re-resolve their index on load
//! - In-memory backend for tests and small data sets

pub mod backend;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod index;
pub mod processor;
pub mod query;
pub mod value;

pub mod prelude {
    pub use crate::backend::SearchBackend;
    pub use crate::context::SearchContext;
    pub use crate::error::{HalberdError, Result};
    pub use crate::index::{Index, SearchIndex};
    pub use crate::query::{Conjunction, Operator, Options, ParseMode, Query, ResultSet};
    pub use crate::value::Value;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
