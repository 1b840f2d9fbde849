//! Ignore-characters processor implementation.
//!
//! Removes every match of a regular expression from the search keys before
//! they reach the backend. Terms left empty are dropped and reported on the
//! result set as ignored search keys.

use regex::Regex;

use super::{Processor, ProcessorStage};
use crate::error::{HalberdError, Result};
use crate::query::{KeyExpression, KeyTerm, Keys, Query};

/// Punctuation stripped when no pattern is configured.
pub const DEFAULT_IGNORABLE: &str = "['¿¡!?,.:;]";

/// A processor that strips ignorable characters from search keys.
#[derive(Clone, Debug)]
pub struct IgnoreCharacters {
    pattern: Regex,
}

impl IgnoreCharacters {
    /// Create a processor stripping [`DEFAULT_IGNORABLE`].
    pub fn punctuation() -> Result<Self> {
        Self::new(DEFAULT_IGNORABLE)
    }

    /// Create a processor stripping every match of `pattern`.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)
                .map_err(|e| HalberdError::Anyhow(anyhow::Error::from(e)))?,
        })
    }

    /// Create a processor stripping every character of the given Unicode
    /// general categories, e.g. `["Pc", "Pd"]`.
    pub fn character_sets<I, S>(sets: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut class = String::from("[");
        for set in sets {
            let set = set.as_ref();
            if set.is_empty() || !set.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(HalberdError::config(format!(
                    "invalid character set '{set}'"
                )));
            }
            class.push_str(&format!("\\p{{{set}}}"));
        }
        if class.len() == 1 {
            return Err(HalberdError::config("no character sets given"));
        }
        class.push(']');
        Self::new(&class)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Strip ignorable characters from a single value.
    pub fn process_field_value(&self, value: &str) -> String {
        self.pattern.replace_all(value, "").into_owned()
    }

    fn process_expression(&self, expr: &mut KeyExpression, ignored: &mut Vec<String>) {
        let terms = std::mem::take(&mut expr.terms);
        for term in terms {
            match term {
                KeyTerm::Term(text) => {
                    let stripped = self.process_field_value(&text);
                    if stripped.trim().is_empty() {
                        ignored.push(text);
                    } else {
                        expr.terms.push(KeyTerm::Term(stripped));
                    }
                }
                KeyTerm::Group(mut group) => {
                    self.process_expression(&mut group, ignored);
                    if !group.is_empty() {
                        expr.terms.push(KeyTerm::Group(group));
                    }
                }
            }
        }
    }
}

impl Processor for IgnoreCharacters {
    fn name(&self) -> &'static str {
        "ignore_characters"
    }

    fn supports_stage(&self, stage: ProcessorStage) -> bool {
        stage == ProcessorStage::PreprocessQuery
    }

    fn preprocess_search_query(&self, query: &mut Query) -> Result<()> {
        let mut ignored = Vec::new();
        match query.keys_mut() {
            Some(Keys::Direct(raw)) => *raw = self.process_field_value(raw),
            Some(Keys::Parsed(expr)) => self.process_expression(expr, &mut ignored),
            None => {}
        }

        let results = query.results_mut();
        for key in ignored {
            results.add_ignored_search_key(key);
        }
        Ok(())
    }
}
