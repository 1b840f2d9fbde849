//! Ignore-case processor implementation.

use super::{Processor, ProcessorStage};
use crate::error::Result;
use crate::query::{KeyExpression, KeyTerm, Keys, Query};

/// A processor that lowercases search keys so matching is case-insensitive.
#[derive(Clone, Debug, Default)]
pub struct IgnoreCase;

impl IgnoreCase {
    /// Create a new ignore-case processor.
    pub fn new() -> Self {
        IgnoreCase
    }
}

fn lowercase_expression(expr: &mut KeyExpression) {
    for term in &mut expr.terms {
        match term {
            KeyTerm::Term(text) => *text = text.to_lowercase(),
            KeyTerm::Group(group) => lowercase_expression(group),
        }
    }
}

impl Processor for IgnoreCase {
    fn name(&self) -> &'static str {
        "ignore_case"
    }

    fn supports_stage(&self, stage: ProcessorStage) -> bool {
        stage == ProcessorStage::PreprocessQuery
    }

    fn preprocess_search_query(&self, query: &mut Query) -> Result<()> {
        match query.keys_mut() {
            Some(Keys::Direct(raw)) => *raw = raw.to_lowercase(),
            Some(Keys::Parsed(expr)) => lowercase_expression(expr),
            None => {}
        }
        Ok(())
    }
}
