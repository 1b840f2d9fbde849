//! Sort directions and the ordered sort map of a query.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortOrder {
    /// Normalize free-form input: anything other than `DESC` (trimmed,
    /// case-insensitive) is ascending.
    pub fn normalize(order: &str) -> Self {
        if order.trim().eq_ignore_ascii_case("DESC") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field → direction map in insertion order.
///
/// Position defines tie-break precedence; overwriting a field keeps its
/// original position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sorts {
    entries: Vec<(String, SortOrder)>,
}

impl Sorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or overwrite the direction of a field.
    pub fn set<S: Into<String>>(&mut self, field: S, order: SortOrder) {
        let field = field.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = order,
            None => self.entries.push((field, order)),
        }
    }

    pub fn get(&self, field: &str) -> Option<SortOrder> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, order)| *order)
    }

    pub fn remove(&mut self, field: &str) -> Option<SortOrder> {
        let pos = self.entries.iter().position(|(f, _)| f == field)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortOrder)> {
        self.entries.iter().map(|(f, o)| (f.as_str(), *o))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Display for Sorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .iter()
            .map(|(field, order)| format!("{field} {order}"))
            .collect();
        f.write_str(&rendered.join(", "))
    }
}
