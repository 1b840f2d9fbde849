//! Error types for the Halberd library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`HalberdError`] enum.
//!
//! # Examples
//!
//! ```
//! use halberd::error::{HalberdError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(HalberdError::query("unknown operator"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Halberd operations.
#[derive(Error, Debug)]
pub enum HalberdError {
    /// I/O errors (reading item or config files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A query cannot be created, e.g. because its index is disabled.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The query's index reference has not been resolved.
    #[error("Missing index: {0}")]
    MissingIndex(String),

    /// Query-related errors (unknown operators, bad parse modes, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Errors raised by a search backend.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Errors raised by a processor or an event listener.
    #[error("Processor error: {0}")]
    Processor(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with HalberdError.
pub type Result<T> = std::result::Result<T, HalberdError>;

impl HalberdError {
    /// Create a new invalid query error.
    pub fn invalid_query<S: Into<String>>(msg: S) -> Self {
        HalberdError::InvalidQuery(msg.into())
    }

    /// Create a new missing index error.
    pub fn missing_index<S: Into<String>>(msg: S) -> Self {
        HalberdError::MissingIndex(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        HalberdError::Query(msg.into())
    }

    /// Create a new backend error.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        HalberdError::Backend(msg.into())
    }

    /// Create a new processor error.
    pub fn processor<S: Into<String>>(msg: S) -> Self {
        HalberdError::Processor(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        HalberdError::Config(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        HalberdError::Other(msg.into())
    }
}
