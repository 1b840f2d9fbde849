//! Result sets produced by executing a query.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::query::query::QueryId;
use crate::value::Value;

/// A single matched item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    /// Identifier of the item within the index.
    id: String,
    /// Relevance score assigned by the backend.
    score: f32,
    /// Field values retrieved by the backend.
    #[serde(default)]
    fields: BTreeMap<String, Value>,
    /// Optional highlighted excerpt.
    #[serde(default)]
    excerpt: Option<String>,
}

impl ResultItem {
    pub fn new<S: Into<String>>(id: S) -> Self {
        ResultItem {
            id: id.into(),
            score: 1.0,
            fields: BTreeMap::new(),
            excerpt: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn with_field<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn set_score(&mut self, score: f32) {
        self.score = score;
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.fields
    }

    pub fn excerpt(&self) -> Option<&str> {
        self.excerpt.as_deref()
    }

    pub fn set_excerpt<S: Into<String>>(&mut self, excerpt: Option<S>) {
        self.excerpt = excerpt.map(Into::into);
    }
}

/// The results of one query.
///
/// Owned by exactly one [`Query`](crate::query::Query); filled in place by
/// the backend and the post-processing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    query_id: QueryId,
    search_id: String,
    result_count: usize,
    result_items: Vec<ResultItem>,
    ignored_search_keys: Vec<String>,
    warnings: Vec<String>,
    extra_data: BTreeMap<String, Value>,
}

impl ResultSet {
    pub(crate) fn new(query_id: QueryId, search_id: String) -> Self {
        ResultSet {
            query_id,
            search_id,
            result_count: 0,
            result_items: Vec::new(),
            ignored_search_keys: Vec::new(),
            warnings: Vec::new(),
            extra_data: BTreeMap::new(),
        }
    }

    /// Identity of the owning query.
    pub fn query_id(&self) -> QueryId {
        self.query_id
    }

    /// Search id of the owning query at the time the results were cached.
    pub fn search_id(&self) -> &str {
        &self.search_id
    }

    pub(crate) fn set_search_id(&mut self, search_id: String) {
        self.search_id = search_id;
    }

    /// Estimated total number of matches, before paging.
    pub fn result_count(&self) -> usize {
        self.result_count
    }

    pub fn set_result_count(&mut self, result_count: usize) -> &mut Self {
        self.result_count = result_count;
        self
    }

    pub fn result_items(&self) -> &[ResultItem] {
        &self.result_items
    }

    pub fn result_items_mut(&mut self) -> &mut Vec<ResultItem> {
        &mut self.result_items
    }

    pub fn result_item(&self, id: &str) -> Option<&ResultItem> {
        self.result_items.iter().find(|item| item.id == id)
    }

    /// Add an item, replacing an existing item with the same id in place.
    pub fn add_result_item(&mut self, item: ResultItem) -> &mut Self {
        match self.result_items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item,
            None => self.result_items.push(item),
        }
        self
    }

    pub fn set_result_items(&mut self, items: Vec<ResultItem>) -> &mut Self {
        self.result_items.clear();
        for item in items {
            self.add_result_item(item);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.result_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.result_items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultItem> {
        self.result_items.iter()
    }

    pub fn ignored_search_keys(&self) -> &[String] {
        &self.ignored_search_keys
    }

    pub fn add_ignored_search_key<S: Into<String>>(&mut self, key: S) -> &mut Self {
        let key = key.into();
        if !self.ignored_search_keys.contains(&key) {
            self.ignored_search_keys.push(key);
        }
        self
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn add_warning<S: Into<String>>(&mut self, warning: S) -> &mut Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn has_extra_data(&self, key: &str) -> bool {
        self.extra_data.contains_key(key)
    }

    pub fn get_extra_data(&self, key: &str) -> Option<&Value> {
        self.extra_data.get(key)
    }

    pub fn set_extra_data<S: Into<String>, V: Into<Value>>(&mut self, key: S, value: V) -> &mut Self {
        self.extra_data.insert(key.into(), value.into());
        self
    }

    pub fn extra_data(&self) -> &BTreeMap<String, Value> {
        &self.extra_data
    }

    pub fn extra_data_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.extra_data
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ResultItem;
    type IntoIter = std::slice::Iter<'a, ResultItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
