//! Condition trees used to filter search results.
//!
//! A [`ConditionGroup`] holds leaf [`Condition`]s and nested groups, combined
//! by a [`Conjunction`]. Groups are append-only: conditions are never removed
//! once added. Translating the tree into backend syntax is the backend's job;
//! the [`Display`](fmt::Display) rendering here is for debugging only.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HalberdError, Result};
use crate::value::Value;

/// Logical combinator for condition groups and keyword expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Conjunction {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Conjunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }

    /// Read a conjunction from an option value, falling back to `AND`.
    pub fn from_value(value: Option<&Value>) -> Self {
        value
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Conjunction {
    type Err = HalberdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Ok(Conjunction::And),
            "OR" => Ok(Conjunction::Or),
            other => Err(HalberdError::query(format!("unknown conjunction '{other}'"))),
        }
    }
}

/// Comparison operator of a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Operator {
    #[default]
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "<>")]
    NotEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "BETWEEN")]
    Between,
    #[serde(rename = "NOT BETWEEN")]
    NotBetween,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = HalberdError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        let op = match normalized.as_str() {
            "=" => Operator::Equal,
            "<>" | "!=" => Operator::NotEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessThanOrEqual,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterThanOrEqual,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "BETWEEN" => Operator::Between,
            "NOT BETWEEN" => Operator::NotBetween,
            _ => return Err(HalberdError::query(format!("unknown operator '{s}'"))),
        };
        Ok(op)
    }
}

/// A single `field OP value` filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    field: String,
    value: Value,
    operator: Operator,
}

impl Condition {
    pub fn new<S: Into<String>, V: Into<Value>>(field: S, value: V, operator: Operator) -> Self {
        Condition {
            field: field.into(),
            value: value.into(),
            operator,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

/// Entry of a condition group: a leaf or a nested group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionNode {
    Condition(Condition),
    Group(ConditionGroup),
}

impl fmt::Display for ConditionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionNode::Condition(condition) => write!(f, "{condition}"),
            ConditionNode::Group(group) => write!(f, "{group}"),
        }
    }
}

/// A node in the condition tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionGroup {
    conjunction: Conjunction,
    conditions: Vec<ConditionNode>,
    tags: Vec<String>,
}

impl ConditionGroup {
    /// Create an empty group.
    pub fn new(conjunction: Conjunction) -> Self {
        ConditionGroup {
            conjunction,
            conditions: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Create an empty group carrying the given tags.
    pub fn with_tags<I, S>(conjunction: Conjunction, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut group = ConditionGroup::new(conjunction);
        for tag in tags {
            group.add_tag(tag);
        }
        group
    }

    pub fn conjunction(&self) -> Conjunction {
        self.conjunction
    }

    /// Append a leaf condition.
    pub fn add_condition<S: Into<String>, V: Into<Value>>(
        &mut self,
        field: S,
        value: V,
        operator: Operator,
    ) -> &mut Self {
        self.conditions
            .push(ConditionNode::Condition(Condition::new(field, value, operator)));
        self
    }

    /// Append a nested group.
    pub fn add_condition_group(&mut self, group: ConditionGroup) -> &mut Self {
        self.conditions.push(ConditionNode::Group(group));
        self
    }

    pub fn conditions(&self) -> &[ConditionNode] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn add_tag<S: Into<String>>(&mut self, tag: S) -> &mut Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl fmt::Display for ConditionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A group with a single child renders as that child.
        if self.conditions.len() == 1 {
            return write!(f, "{}", self.conditions[0]);
        }
        if self.conditions.is_empty() {
            return Ok(());
        }

        let rendered: Vec<String> = self
            .conditions
            .iter()
            .map(|node| match node {
                ConditionNode::Condition(c) => c.to_string().trim().to_string(),
                ConditionNode::Group(g) => g.to_string().trim().replace('\n', "\n  "),
            })
            .collect();
        let separator = format!("\n{}\n  ", self.conjunction);
        write!(f, "[\n  {}\n]", rendered.join(&separator))
    }
}
