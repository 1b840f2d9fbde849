//! Insertion-ordered tag set.

use serde::{Deserialize, Serialize};

/// Labels attached to a query. Iteration follows insertion order, which is
/// also the order in which tag-scoped event listeners fire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tags {
    tags: Vec<String>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag; returns `false` if it was already present.
    pub fn insert<S: Into<String>>(&mut self, tag: S) -> bool {
        let tag = tag.into();
        if self.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        before != self.tags.len()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.tags.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_ordered_and_unique() {
        let mut tags = Tags::new();
        assert!(tags.insert("views"));
        assert!(tags.insert("autocomplete"));
        assert!(!tags.insert("views"));

        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["views", "autocomplete"]);
        assert!(tags.remove("views"));
        assert!(!tags.contains("views"));
    }
}
