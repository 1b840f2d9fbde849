//! Configuration for query construction.
//!
//! # Examples
//!
//! ```
//! use halberd::config::QueryConfig;
//! use halberd::query::{Conjunction, ParseMode};
//!
//! let config = QueryConfig::default();
//! assert_eq!(config.default_parse_mode, ParseMode::Terms);
//! assert_eq!(config.default_conjunction, Conjunction::And);
//!
//! let config = QueryConfig::from_json_str(r#"{"default_parse_mode": "single"}"#).unwrap();
//! assert_eq!(config.default_parse_mode, ParseMode::Single);
//! assert_eq!(config.default_search_id, "halberd::query::Query");
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HalberdError, Result};
use crate::query::{Conjunction, ParseMode};

/// Search id used when the caller does not identify itself.
pub const DEFAULT_SEARCH_ID: &str = "halberd::query::Query";

/// Defaults applied to every newly constructed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Parse mode for keywords.
    pub default_parse_mode: ParseMode,
    /// Value of the `conjunction` option.
    pub default_conjunction: Conjunction,
    /// Value of the `search id` option.
    pub default_search_id: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_parse_mode: ParseMode::Terms,
            default_conjunction: Conjunction::And,
            default_search_id: DEFAULT_SEARCH_ID.to_string(),
        }
    }
}

impl QueryConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: QueryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_search_id.trim().is_empty() {
            return Err(HalberdError::config("default_search_id must not be empty"));
        }
        Ok(())
    }
}
