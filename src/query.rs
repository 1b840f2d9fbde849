//! Query system: building, executing and caching searches.

pub mod cache;
pub mod condition;
pub mod keys;
#[allow(clippy::module_inception)]
pub mod query;
pub mod results;
pub mod sort;
pub mod tags;

pub use cache::{ResultsCache, StaticResultsCache};
pub use condition::{Condition, ConditionGroup, ConditionNode, Conjunction, Operator};
pub use keys::{KeyExpression, KeyTerm, Keys, ParseMode, ParseModeInfo, parse_keys, parse_modes};
pub use query::{
    Abort, OPTION_CONJUNCTION, OPTION_LIMIT, OPTION_OFFSET, OPTION_SEARCH_ID, Options,
    PersistedQuery, Query, QueryId,
};
pub use results::{ResultItem, ResultSet};
pub use sort::{SortOrder, Sorts};
pub use tags::Tags;
