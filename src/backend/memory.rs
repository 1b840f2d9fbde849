//! In-memory search backend.
//!
//! Holds items in a vector and evaluates every query by scanning them. Fit
//! for tests, demos and small data sets.
//!
//! Keyword matching works on Unicode words (UAX #29), compared
//! case-insensitively. A term containing several words is a phrase and only
//! matches consecutive words. The score of an item is the number of keyword
//! occurrences found.
//!
//! Two pseudo fields are understood by conditions and sorts:
//! [`FIELD_ID`] (the item id) and [`FIELD_LANGUAGE`] (the item language).
//! Sorting additionally understands [`FIELD_RELEVANCE`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use super::SearchBackend;
use crate::error::{HalberdError, Result};
use crate::query::{
    Condition, ConditionGroup, ConditionNode, Conjunction, KeyExpression, KeyTerm, Keys,
    Operator, Query, ResultItem, SortOrder,
};
use crate::value::Value;

/// Pseudo field holding the item id.
pub const FIELD_ID: &str = "search_api_id";
/// Pseudo field holding the item language.
pub const FIELD_LANGUAGE: &str = "search_api_language";
/// Pseudo field holding the keyword score, for sorting.
pub const FIELD_RELEVANCE: &str = "search_api_relevance";

const FEATURES: &[&str] = &["search_api_language", "search_api_between"];

/// An item stored in a [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedItem {
    id: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

impl IndexedItem {
    pub fn new<S: Into<String>>(id: S) -> Self {
        IndexedItem {
            id: id.into(),
            language: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_field<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Value of a field, including the pseudo fields.
    fn field_value(&self, name: &str) -> Value {
        match name {
            FIELD_ID => Value::Text(self.id.clone()),
            FIELD_LANGUAGE => Value::from(self.language.clone()),
            _ => self.fields.get(name).cloned().unwrap_or_default(),
        }
    }

    /// Lowercased words of the given fields, one list per field.
    fn words(&self, fields: Option<&[String]>) -> Vec<Vec<String>> {
        let mut texts = Vec::new();
        match fields {
            Some(names) => {
                for name in names {
                    if let Some(value) = self.fields.get(name) {
                        collect_text(value, &mut texts);
                    }
                }
            }
            None => {
                for value in self.fields.values() {
                    collect_text(value, &mut texts);
                }
            }
        }
        texts.iter().map(|text| tokenize(text)).collect()
    }
}

fn collect_text<'a>(value: &'a Value, texts: &mut Vec<&'a str>) {
    match value {
        Value::Text(text) => texts.push(text),
        Value::List(items) => items.iter().for_each(|item| collect_text(item, texts)),
        _ => {}
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

/// A [`SearchBackend`] scanning items held in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: RwLock<Vec<IndexedItem>>,
    searches: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add items, replacing stored items with the same id.
    pub fn index_items(&self, items: Vec<IndexedItem>) {
        let mut stored = self.items.write();
        for item in items {
            match stored.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => *existing = item,
                None => stored.push(item),
            }
        }
    }

    pub fn delete_item(&self, id: &str) -> bool {
        let mut stored = self.items.write();
        let before = stored.len();
        stored.retain(|item| item.id != id);
        stored.len() != before
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of searches run so far.
    pub fn search_count(&self) -> usize {
        self.searches.load(AtomicOrdering::SeqCst)
    }
}

impl SearchBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn supports_feature(&self, feature: &str) -> bool {
        FEATURES.contains(&feature)
    }

    fn search(&self, query: &mut Query) -> Result<()> {
        self.searches.fetch_add(1, AtomicOrdering::SeqCst);

        let fulltext_fields: Option<Vec<String>> = match query.fulltext_fields() {
            Some(fields) => Some(fields.to_vec()),
            None => {
                let fields = query.index()?.fulltext_fields();
                (!fields.is_empty()).then(|| fields.to_vec())
            }
        };

        let items = self.items.read();
        let mut hits: Vec<(f32, &IndexedItem)> = Vec::new();
        for item in items.iter() {
            if let Some(languages) = query.languages() {
                let matches_language = item
                    .language()
                    .is_some_and(|language| languages.iter().any(|l| l == language));
                if !matches_language {
                    continue;
                }
            }
            if !matches_group(query.condition_group(), item)? {
                continue;
            }
            let score = match query.get_keys() {
                Some(keys) => match score_keys(keys, &item.words(fulltext_fields.as_deref())) {
                    Some(score) => score,
                    None => continue,
                },
                None => 1.0,
            };
            hits.push((score, item));
        }

        let mut sorts: Vec<(String, SortOrder)> = query
            .sorts()
            .iter()
            .map(|(field, order)| (field.to_string(), order))
            .collect();
        if sorts.is_empty() && query.get_keys().is_some() {
            sorts.push((FIELD_RELEVANCE.to_string(), SortOrder::Desc));
        }
        hits.sort_by(|a, b| compare_hits(a, b, &sorts));

        let total = hits.len();
        let offset = query.offset().unwrap_or(0);
        let page: Vec<ResultItem> = hits
            .into_iter()
            .skip(offset)
            .take(query.limit().unwrap_or(usize::MAX))
            .map(|(score, item)| {
                let mut result = ResultItem::new(item.id.clone()).with_score(score);
                result.fields_mut().extend(item.fields.clone());
                result
            })
            .collect();
        drop(items);

        debug!(
            "memory backend matched {total} item(s) for query {}, returning {}",
            query.id(),
            page.len()
        );
        let results = query.results_mut();
        results.set_result_count(total);
        for item in page {
            results.add_result_item(item);
        }
        Ok(())
    }
}

fn compare_hits(
    a: &(f32, &IndexedItem),
    b: &(f32, &IndexedItem),
    sorts: &[(String, SortOrder)],
) -> Ordering {
    for (field, order) in sorts {
        let ordering = if field == FIELD_RELEVANCE {
            directed(a.0.total_cmp(&b.0), *order)
        } else {
            compare_sort_values(&a.1.field_value(field), &b.1.field_value(field), *order)
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

// Missing values sort last whatever the direction.
fn compare_sort_values(a: &Value, b: &Value, order: SortOrder) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => directed(sort_cmp(a, b), order),
    }
}

// Position of each kind of value in a sort: booleans, then numbers, then
// text, then compound values.
fn sort_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Integer(_) | Value::Float(_) => 2,
        Value::Text(_) => 3,
        Value::List(_) => 4,
        Value::Map(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Total order over values used for sorting. Values of different kinds
/// never compare by content, so numeric text sorts with text.
fn sort_cmp(a: &Value, b: &Value) -> Ordering {
    sort_rank(a).cmp(&sort_rank(b)).then_with(|| match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            numeric_sort_key(a).total_cmp(&numeric_sort_key(b)).then_with(|| {
                // Equal as f64: integers first.
                match (a, b) {
                    (Value::Integer(_), Value::Float(_)) => Ordering::Less,
                    (Value::Float(_), Value::Integer(_)) => Ordering::Greater,
                    _ => Ordering::Equal,
                }
            })
        }
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::List(x), Value::List(y)) => x
            .iter()
            .zip(y)
            .map(|(x, y)| sort_cmp(x, y))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => Ordering::Equal,
    })
}

fn numeric_sort_key(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

/// Order two scalar values. Text is compared numerically against numbers
/// when it parses as one.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => {
            let x = numeric(a)?;
            let y = numeric(b)?;
            x.partial_cmp(&y)
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Text(text) => text.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => other.as_f64(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        _ => compare_values(a, b) == Some(Ordering::Equal),
    }
}

fn matches_group(group: &ConditionGroup, item: &IndexedItem) -> Result<bool> {
    let mut outcomes = Vec::with_capacity(group.conditions().len());
    for node in group.conditions() {
        outcomes.push(match node {
            ConditionNode::Condition(condition) => matches_condition(condition, item)?,
            ConditionNode::Group(nested) => matches_group(nested, item)?,
        });
    }
    Ok(match group.conjunction() {
        Conjunction::And => outcomes.iter().all(|&o| o),
        // An empty OR group places no restriction.
        Conjunction::Or => outcomes.is_empty() || outcomes.iter().any(|&o| o),
    })
}

fn matches_condition(condition: &Condition, item: &IndexedItem) -> Result<bool> {
    let field = item.field_value(condition.field());
    // Multi-valued fields match if any of their values does.
    let values: Vec<&Value> = match &field {
        Value::List(values) if !values.is_empty() => values.iter().collect(),
        other => vec![other],
    };
    let expected = condition.value();
    let any = |test: fn(&Value, &Value) -> bool| values.iter().any(|v| test(v, expected));

    Ok(match condition.operator() {
        Operator::Equal => any(values_equal),
        Operator::NotEqual => !any(values_equal),
        Operator::LessThan => any(|v, e| compare_values(v, e) == Some(Ordering::Less)),
        Operator::LessThanOrEqual => {
            any(|v, e| matches!(compare_values(v, e), Some(Ordering::Less | Ordering::Equal)))
        }
        Operator::GreaterThan => any(|v, e| compare_values(v, e) == Some(Ordering::Greater)),
        Operator::GreaterThanOrEqual => {
            any(|v, e| matches!(compare_values(v, e), Some(Ordering::Greater | Ordering::Equal)))
        }
        Operator::In | Operator::NotIn => {
            let options = list_operand(condition)?;
            let found = values
                .iter()
                .any(|v| options.iter().any(|o| values_equal(v, o)));
            if condition.operator() == Operator::In { found } else { !found }
        }
        Operator::Between | Operator::NotBetween => {
            let (low, high) = match list_operand(condition)? {
                [low, high] => (low, high),
                _ => {
                    return Err(HalberdError::query(format!(
                        "operator {} on '{}' needs exactly two values",
                        condition.operator(),
                        condition.field()
                    )));
                }
            };
            let inside = values.iter().any(|v| {
                matches!(compare_values(v, low), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare_values(v, high), Some(Ordering::Less | Ordering::Equal))
            });
            if condition.operator() == Operator::Between { inside } else { !inside }
        }
    })
}

fn list_operand(condition: &Condition) -> Result<&[Value]> {
    condition.value().as_list().ok_or_else(|| {
        HalberdError::query(format!(
            "operator {} on '{}' needs a list value",
            condition.operator(),
            condition.field()
        ))
    })
}

/// Score of an item against the keys, or `None` if it does not match.
fn score_keys(keys: &Keys, fields: &[Vec<String>]) -> Option<f32> {
    match keys {
        Keys::Direct(raw) => score_term(raw, fields),
        Keys::Parsed(expression) => score_expression(expression, fields),
    }
}

fn score_expression(expression: &KeyExpression, fields: &[Vec<String>]) -> Option<f32> {
    if expression.is_empty() {
        return Some(0.0);
    }
    let scores = expression.terms.iter().map(|term| match term {
        KeyTerm::Term(text) => score_term(text, fields),
        KeyTerm::Group(group) => score_expression(group, fields),
    });
    match expression.conjunction {
        Conjunction::And => scores.sum::<Option<f32>>(),
        Conjunction::Or => scores.flatten().reduce(|a, b| a + b),
    }
}

/// Number of occurrences of a term, or `None` if there are none. Terms
/// without any word match trivially.
fn score_term(term: &str, fields: &[Vec<String>]) -> Option<f32> {
    let phrase = tokenize(term);
    if phrase.is_empty() {
        return Some(0.0);
    }
    let count: usize = fields
        .iter()
        .map(|words| {
            words
                .windows(phrase.len())
                .filter(|window| *window == phrase.as_slice())
                .count()
        })
        .sum();
    (count > 0).then_some(count as f32)
}
