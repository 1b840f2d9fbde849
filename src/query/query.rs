//! The search query and its execution lifecycle.
//!
//! A [`Query`] accumulates keys, conditions, sorts, options and tags, then
//! runs a fixed pipeline on [`Query::execute`]:
//!
//! 1. Pre-processing: the index's processors, then `QueryAlter` listeners.
//! 2. Backend search.
//! 3. Post-processing: the index's processors, then `ResultsAlter`
//!    listeners, then the result set is stored in the results cache.
//!
//! Execution happens at most once per query. An aborted query (or one whose
//! language list is explicitly empty) skips the backend but is still
//! post-processed and cached.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use halberd::backend::memory::{IndexedItem, MemoryBackend};
//! use halberd::context::SearchContext;
//! use halberd::index::SearchIndex;
//! use halberd::query::{Operator, Options, Query};
//!
//! let backend = Arc::new(MemoryBackend::new());
//! backend.index_items(vec![
//!     IndexedItem::new("1").with_field("title", "Rust search").with_field("status", 1),
//!     IndexedItem::new("2").with_field("title", "Other things").with_field("status", 1),
//! ]);
//! let index = Arc::new(SearchIndex::new("articles").with_server(backend));
//!
//! let context = SearchContext::new();
//! let mut query = Query::new(index, &context, Options::new()).unwrap();
//! query.keys(Some("rust")).add_condition("status", 1, Operator::Equal);
//!
//! let results = query.execute().unwrap();
//! assert_eq!(results.result_count(), 1);
//! assert_eq!(results.result_items()[0].id(), "1");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_SEARCH_ID;
use crate::context::SearchContext;
use crate::error::{HalberdError, Result};
use crate::event::EventPayload;
use crate::index::Index;
use crate::query::condition::{ConditionGroup, Conjunction, Operator};
use crate::query::keys::{Keys, ParseMode, ParseModeInfo, parse_keys, parse_modes};
use crate::query::results::ResultSet;
use crate::query::sort::{SortOrder, Sorts};
use crate::query::tags::Tags;
use crate::value::Value;

/// Option holding the conjunction used when parsing keys.
pub const OPTION_CONJUNCTION: &str = "conjunction";
/// Option identifying the calling context.
pub const OPTION_SEARCH_ID: &str = "search id";
/// Option holding the paging offset.
pub const OPTION_OFFSET: &str = "offset";
/// Option holding the paging limit.
pub const OPTION_LIMIT: &str = "limit";

/// Open option map of a query.
pub type Options = BTreeMap<String, Value>;

/// Unique identity of a query, preserved across persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryId(Uuid);

impl QueryId {
    pub fn new() -> Self {
        QueryId(Uuid::new_v4())
    }
}

impl Default for QueryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a query was aborted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Abort {
    /// Aborted without a message.
    Flag,
    /// Aborted with a human-readable message.
    Message(String),
}

/// A search query on one index.
#[derive(Debug)]
pub struct Query {
    id: QueryId,
    index: Option<Arc<dyn Index>>,
    index_id: Option<String>,
    context: SearchContext,
    results: ResultSet,
    parse_mode: ParseMode,
    languages: Option<Vec<String>>,
    keys: Option<Keys>,
    original_keys: Option<String>,
    fulltext_fields: Option<Vec<String>>,
    condition_group: ConditionGroup,
    sorts: Sorts,
    aborted: Option<Abort>,
    options: Options,
    tags: Tags,
    pre_execute_ran: bool,
    executed: bool,
}

impl Query {
    /// Create a query on `index`.
    ///
    /// Caller options override the defaults for `conjunction` and
    /// `search id` taken from the context's configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HalberdError::InvalidQuery`] if the index is disabled.
    pub fn new(index: Arc<dyn Index>, context: &SearchContext, options: Options) -> Result<Self> {
        if !index.status() {
            return Err(HalberdError::invalid_query(format!(
                "Can't search on index '{}' which is disabled.",
                index.label()
            )));
        }

        let config = context.config();
        let mut merged = Options::new();
        merged.insert(
            OPTION_CONJUNCTION.to_string(),
            Value::from(config.default_conjunction.as_str()),
        );
        merged.insert(
            OPTION_SEARCH_ID.to_string(),
            Value::from(config.default_search_id.as_str()),
        );
        merged.extend(options);

        let id = QueryId::new();
        let search_id = merged
            .get(OPTION_SEARCH_ID)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SEARCH_ID)
            .to_string();
        debug!("created query {id} on index '{}'", index.id());

        Ok(Query {
            id,
            index_id: Some(index.id().to_string()),
            index: Some(index),
            context: context.clone(),
            results: ResultSet::new(id, search_id),
            parse_mode: config.default_parse_mode,
            languages: None,
            keys: None,
            original_keys: None,
            fulltext_fields: None,
            condition_group: ConditionGroup::new(Conjunction::And),
            sorts: Sorts::new(),
            aborted: None,
            options: merged,
            tags: Tags::new(),
            pre_execute_ran: false,
            executed: false,
        })
    }

    /// Create an empty condition group for use with
    /// [`add_condition_group`](Self::add_condition_group).
    pub fn create_condition_group<I, S>(conjunction: Conjunction, tags: I) -> ConditionGroup
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConditionGroup::with_tags(conjunction, tags)
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    /// The index this query runs on.
    ///
    /// # Errors
    ///
    /// Returns [`HalberdError::MissingIndex`] if the query was rehydrated
    /// without resolving its index.
    pub fn index(&self) -> Result<&Arc<dyn Index>> {
        self.index.as_ref().ok_or_else(|| {
            HalberdError::missing_index(format!(
                "index '{}' of query {} is not loaded",
                self.index_id.as_deref().unwrap_or("<none>"),
                self.id
            ))
        })
    }

    /// Identifier of the index, available even while it is unresolved.
    pub fn index_id(&self) -> Option<&str> {
        match &self.index {
            Some(index) => Some(index.id()),
            None => self.index_id.as_deref(),
        }
    }

    pub fn context(&self) -> &SearchContext {
        &self.context
    }

    pub fn parse_modes() -> Vec<ParseModeInfo> {
        parse_modes()
    }

    pub fn parse_mode(&self) -> ParseMode {
        self.parse_mode
    }

    /// Set the parse mode used by subsequent [`keys`](Self::keys) calls.
    pub fn set_parse_mode(&mut self, parse_mode: ParseMode) -> &mut Self {
        self.parse_mode = parse_mode;
        self
    }

    /// Conjunction used when parsing keys, from the `conjunction` option.
    pub fn conjunction(&self) -> Conjunction {
        Conjunction::from_value(self.options.get(OPTION_CONJUNCTION))
    }

    /// Set the search keys. `None` turns the query into a filter-only search.
    pub fn keys(&mut self, keys: Option<&str>) -> &mut Self {
        self.original_keys = keys.map(str::to_string);
        self.keys = keys.map(|raw| parse_keys(raw, self.parse_mode, self.conjunction()));
        self
    }

    pub fn get_keys(&self) -> Option<&Keys> {
        self.keys.as_ref()
    }

    /// In-place access to the parsed keys.
    pub fn keys_mut(&mut self) -> &mut Option<Keys> {
        &mut self.keys
    }

    /// The raw keys as last passed to [`keys`](Self::keys).
    pub fn original_keys(&self) -> Option<&str> {
        self.original_keys.as_deref()
    }

    pub fn languages(&self) -> Option<&[String]> {
        self.languages.as_deref()
    }

    /// Restrict the searched languages. `Some(vec![])` aborts execution.
    pub fn set_languages(&mut self, languages: Option<Vec<String>>) -> &mut Self {
        self.languages = languages;
        self
    }

    pub fn languages_mut(&mut self) -> &mut Option<Vec<String>> {
        &mut self.languages
    }

    pub fn fulltext_fields(&self) -> Option<&[String]> {
        self.fulltext_fields.as_deref()
    }

    /// Restrict keyword matching to the given fields; `None` searches all.
    pub fn set_fulltext_fields(&mut self, fields: Option<Vec<String>>) -> &mut Self {
        self.fulltext_fields = fields;
        self
    }

    pub fn fulltext_fields_mut(&mut self) -> &mut Option<Vec<String>> {
        &mut self.fulltext_fields
    }

    pub fn condition_group(&self) -> &ConditionGroup {
        &self.condition_group
    }

    pub fn condition_group_mut(&mut self) -> &mut ConditionGroup {
        &mut self.condition_group
    }

    pub fn add_condition<S: Into<String>, V: Into<Value>>(
        &mut self,
        field: S,
        value: V,
        operator: Operator,
    ) -> &mut Self {
        self.condition_group.add_condition(field, value, operator);
        self
    }

    pub fn add_condition_group(&mut self, group: ConditionGroup) -> &mut Self {
        self.condition_group.add_condition_group(group);
        self
    }

    /// Sort by a field. The order is normalized with
    /// [`SortOrder::normalize`]; re-sorting a field keeps its position.
    pub fn sort<S: Into<String>>(&mut self, field: S, order: &str) -> &mut Self {
        self.sorts.set(field, SortOrder::normalize(order));
        self
    }

    pub fn sorts(&self) -> &Sorts {
        &self.sorts
    }

    pub fn sorts_mut(&mut self) -> &mut Sorts {
        &mut self.sorts
    }

    /// Set the `offset` and `limit` options.
    pub fn range(&mut self, offset: Option<usize>, limit: Option<usize>) -> &mut Self {
        self.options
            .insert(OPTION_OFFSET.to_string(), Value::from(offset));
        self.options.insert(OPTION_LIMIT.to_string(), Value::from(limit));
        self
    }

    pub fn offset(&self) -> Option<usize> {
        self.option_usize(OPTION_OFFSET)
    }

    pub fn limit(&self) -> Option<usize> {
        self.option_usize(OPTION_LIMIT)
    }

    fn option_usize(&self, name: &str) -> Option<usize> {
        self.options
            .get(name)
            .and_then(Value::as_i64)
            .and_then(|v| usize::try_from(v).ok())
    }

    pub fn get_option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Set an option, returning its previous value.
    pub fn set_option<S: Into<String>, V: Into<Value>>(&mut self, name: S, value: V) -> Option<Value> {
        self.options.insert(name.into(), value.into())
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Value of the `search id` option.
    pub fn search_id(&self) -> &str {
        self.options
            .get(OPTION_SEARCH_ID)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SEARCH_ID)
    }

    pub fn add_tag<S: Into<String>>(&mut self, tag: S) -> &mut Self {
        self.tags.insert(tag);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn has_all_tags(&self, tags: &[&str]) -> bool {
        tags.iter().all(|t| self.tags.contains(t))
    }

    pub fn has_any_tag(&self, tags: &[&str]) -> bool {
        tags.iter().any(|t| self.tags.contains(t))
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut Tags {
        &mut self.tags
    }

    /// Abort the query without a message.
    pub fn abort(&mut self) {
        self.aborted = Some(Abort::Flag);
    }

    /// Abort the query, replacing any previous abort reason.
    pub fn abort_with_message<S: Into<String>>(&mut self, message: S) {
        self.aborted = Some(Abort::Message(message.into()));
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// The abort message, if the query was aborted with one.
    pub fn abort_message(&self) -> Option<&str> {
        match &self.aborted {
            Some(Abort::Message(message)) => Some(message),
            _ => None,
        }
    }

    pub fn has_executed(&self) -> bool {
        self.executed
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    /// In-place access to the result set, for backends and processors.
    pub fn results_mut(&mut self) -> &mut ResultSet {
        &mut self.results
    }

    /// Execute the query and return its results.
    ///
    /// Runs at most once: later calls return the same result set without
    /// running any stage again. If a stage fails, the error is returned and
    /// the query stays marked as executed, so a retry returns the partial
    /// result set.
    pub fn execute(&mut self) -> Result<&ResultSet> {
        if self.executed {
            debug!("query {} already executed, returning its results", self.id);
            return Ok(&self.results);
        }
        self.executed = true;

        // Checked both before and after pre-processing.
        if self.should_abort()? {
            return Ok(&self.results);
        }

        self.pre_execute()?;

        if self.should_abort()? {
            return Ok(&self.results);
        }

        let server = self.index()?.server()?;
        debug!(
            "dispatching query {} to backend '{}'",
            self.id,
            server.name()
        );
        server.search(self)?;

        self.post_execute()?;

        Ok(&self.results)
    }

    /// Post-processes and returns `true` if execution must stop here.
    fn should_abort(&mut self) -> Result<bool> {
        let no_languages = matches!(&self.languages, Some(languages) if languages.is_empty());
        if !self.was_aborted() && !no_languages {
            return Ok(false);
        }

        match &self.aborted {
            Some(Abort::Message(message)) => info!("query {} aborted: {message}", self.id),
            Some(Abort::Flag) => info!("query {} aborted", self.id),
            None => info!("query {} has no languages to search", self.id),
        }
        self.post_execute()?;
        Ok(true)
    }

    /// Run pre-processing. Only the first call has any effect.
    pub fn pre_execute(&mut self) -> Result<()> {
        if self.pre_execute_ran {
            return Ok(());
        }
        self.pre_execute_ran = true;

        let index = Arc::clone(self.index()?);
        index.preprocess_search_query(self)?;

        let events = Arc::clone(self.context.events());
        let tags = self.tags.to_vec();
        events.dispatch(&tags, EventPayload::Query(self))
    }

    /// Run post-processing and store the results in the cache.
    pub fn post_execute(&mut self) -> Result<()> {
        let index = Arc::clone(self.index()?);
        index.postprocess_search_results(&mut self.results)?;

        let events = Arc::clone(self.context.events());
        let tags = self.tags.to_vec();
        events.dispatch(&tags, EventPayload::Results(&mut self.results))?;

        let search_id = self.search_id().to_string();
        self.results.set_search_id(search_id);
        self.context.results_cache().add_results(&self.results);
        Ok(())
    }

    /// Snapshot this query for persistence. Only the index id is kept.
    pub fn to_persisted(&self) -> PersistedQuery {
        PersistedQuery {
            id: self.id,
            index_id: self.index_id().map(str::to_string),
            parse_mode: self.parse_mode,
            languages: self.languages.clone(),
            keys: self.keys.clone(),
            original_keys: self.original_keys.clone(),
            fulltext_fields: self.fulltext_fields.clone(),
            condition_group: self.condition_group.clone(),
            sorts: self.sorts.clone(),
            aborted: self.aborted.clone(),
            options: self.options.clone(),
            tags: self.tags.clone(),
            pre_execute_ran: self.pre_execute_ran,
            executed: self.executed,
            results: self.results.clone(),
        }
    }

    /// Rehydrate a persisted query.
    ///
    /// The index is looked up through the context's registry. Without a
    /// context, without a registry, or if the id is unknown, the index stays
    /// unresolved and the first operation needing it fails with
    /// [`HalberdError::MissingIndex`].
    pub fn from_persisted(persisted: PersistedQuery, context: Option<&SearchContext>) -> Self {
        let index = match (context, persisted.index_id.as_deref()) {
            (Some(ctx), Some(index_id)) => match ctx.registry() {
                Some(registry) => {
                    let index = registry.load_index(index_id);
                    if index.is_none() {
                        warn!("index '{index_id}' of query {} not found", persisted.id);
                    }
                    index
                }
                None => {
                    warn!("no index registry to resolve index '{index_id}'");
                    None
                }
            },
            (None, Some(index_id)) => {
                warn!("no application context to resolve index '{index_id}'");
                None
            }
            (_, None) => None,
        };

        Query {
            id: persisted.id,
            index,
            index_id: persisted.index_id,
            context: context.cloned().unwrap_or_default(),
            results: persisted.results,
            parse_mode: persisted.parse_mode,
            languages: persisted.languages,
            keys: persisted.keys,
            original_keys: persisted.original_keys,
            fulltext_fields: persisted.fulltext_fields,
            condition_group: persisted.condition_group,
            sorts: persisted.sorts,
            aborted: persisted.aborted,
            options: persisted.options,
            tags: persisted.tags,
            pre_execute_ran: persisted.pre_execute_ran,
            executed: persisted.executed,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_persisted())?)
    }

    pub fn from_json(json: &str, context: Option<&SearchContext>) -> Result<Self> {
        let persisted: PersistedQuery = serde_json::from_str(json)?;
        Ok(Self::from_persisted(persisted, context))
    }
}

/// Serializable form of a [`Query`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedQuery {
    pub id: QueryId,
    pub index_id: Option<String>,
    pub parse_mode: ParseMode,
    pub languages: Option<Vec<String>>,
    pub keys: Option<Keys>,
    pub original_keys: Option<String>,
    pub fulltext_fields: Option<Vec<String>>,
    pub condition_group: ConditionGroup,
    pub sorts: Sorts,
    pub aborted: Option<Abort>,
    pub options: Options,
    pub tags: Tags,
    pub pre_execute_ran: bool,
    pub executed: bool,
    pub results: ResultSet,
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.index, &self.index_id) {
            (Some(index), _) => writeln!(f, "Index: {}", index.id())?,
            (None, Some(index_id)) => writeln!(f, "Index: {index_id} (not loaded)")?,
            (None, None) => writeln!(f, "Index: NULL")?,
        }
        match &self.original_keys {
            Some(raw) => writeln!(f, "Keys: '{raw}'")?,
            None => writeln!(f, "Keys: NULL")?,
        }
        if let Some(keys) = &self.keys {
            writeln!(f, "Parsed keys: {keys}")?;
            match &self.fulltext_fields {
                Some(fields) => writeln!(f, "Searched fields: {}", fields.join(", "))?,
                None => writeln!(f, "Searched fields: [ALL]")?,
            }
        }
        if let Some(languages) = &self.languages {
            writeln!(f, "Searched languages: {}", languages.join(", "))?;
        }
        let conditions = self.condition_group.to_string();
        if !conditions.is_empty() {
            writeln!(f, "Conditions:\n  {}", conditions.replace('\n', "\n  "))?;
        }
        if !self.sorts.is_empty() {
            writeln!(f, "Sorting: {}", self.sorts)?;
        }
        let options = Value::Map(self.options.clone()).sanitized();
        writeln!(f, "Options: {options}")
    }
}
