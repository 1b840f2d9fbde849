//! Keyword parsing.
//!
//! Converts raw user input into [`Keys`] according to a [`ParseMode`]. The
//! parser is a pure function; the query calls it with its current parse mode
//! and `conjunction` option.
//!
//! # Examples
//!
//! ```
//! use halberd::query::{Conjunction, KeyTerm, Keys, ParseMode, parse_keys};
//!
//! let keys = parse_keys("\"hello world\" foo", ParseMode::Terms, Conjunction::And);
//! match keys {
//!     Keys::Parsed(expr) => {
//!         assert_eq!(expr.conjunction, Conjunction::And);
//!         assert_eq!(
//!             expr.terms,
//!             vec![KeyTerm::from("hello world"), KeyTerm::from("foo")]
//!         );
//!     }
//!     Keys::Direct(_) => unreachable!(),
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HalberdError, Result};
use crate::query::condition::Conjunction;

/// Strategy for turning raw keyword input into structured keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Hand the input to the backend unaltered.
    Direct,
    /// Treat the whole input as one keyword.
    Single,
    /// Space-separated keywords, with `"quoted phrases"`.
    #[default]
    Terms,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Direct => "direct",
            ParseMode::Single => "single",
            ParseMode::Terms => "terms",
        }
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParseMode {
    type Err = HalberdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(ParseMode::Direct),
            "single" => Ok(ParseMode::Single),
            "terms" => Ok(ParseMode::Terms),
            other => Err(HalberdError::query(format!("unknown parse mode '{other}'"))),
        }
    }
}

/// Human-readable description of a parse mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeInfo {
    pub mode: ParseMode,
    pub name: &'static str,
    pub description: &'static str,
}

/// List the available parse modes.
pub fn parse_modes() -> Vec<ParseModeInfo> {
    vec![
        ParseModeInfo {
            mode: ParseMode::Direct,
            name: "Direct query",
            description: "Don't parse the query, just hand it to the search server unaltered. \
                Might fail if the query contains syntax errors in regard to the specific \
                server's query syntax.",
        },
        ParseModeInfo {
            mode: ParseMode::Single,
            name: "Single term",
            description: "The query is interpreted as a single keyword, maybe containing \
                spaces or special characters.",
        },
        ParseModeInfo {
            mode: ParseMode::Terms,
            name: "Multiple terms",
            description: "The query is interpreted as multiple keywords separated by spaces. \
                Keywords containing spaces may be \"quoted\". Quoted keywords must still be \
                separated by spaces.",
        },
    ]
}

/// One entry of a keyword expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyTerm {
    /// A keyword or phrase.
    Term(String),
    /// A nested expression.
    Group(KeyExpression),
}

impl KeyTerm {
    pub fn as_term(&self) -> Option<&str> {
        match self {
            KeyTerm::Term(t) => Some(t),
            KeyTerm::Group(_) => None,
        }
    }
}

impl From<&str> for KeyTerm {
    fn from(value: &str) -> Self {
        KeyTerm::Term(value.to_string())
    }
}

impl From<String> for KeyTerm {
    fn from(value: String) -> Self {
        KeyTerm::Term(value)
    }
}

/// Ordered terms combined by a conjunction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyExpression {
    pub conjunction: Conjunction,
    pub terms: Vec<KeyTerm>,
}

impl KeyExpression {
    pub fn new(conjunction: Conjunction, terms: Vec<KeyTerm>) -> Self {
        KeyExpression { conjunction, terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// All plain terms, depth first.
    pub fn flatten(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for term in &self.terms {
            match term {
                KeyTerm::Term(t) => out.push(t.as_str()),
                KeyTerm::Group(group) => out.extend(group.flatten()),
            }
        }
        out
    }
}

impl fmt::Display for KeyExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.conjunction)?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match term {
                KeyTerm::Term(t) => write!(f, "'{t}'")?,
                KeyTerm::Group(group) => write!(f, "{group}")?,
            }
        }
        write!(f, ")")
    }
}

/// Parsed search keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keys {
    /// Raw passthrough for the backend.
    Direct(String),
    /// Structured expression.
    Parsed(KeyExpression),
}

impl Keys {
    pub fn as_expression(&self) -> Option<&KeyExpression> {
        match self {
            Keys::Parsed(expr) => Some(expr),
            Keys::Direct(_) => None,
        }
    }

    pub fn as_expression_mut(&mut self) -> Option<&mut KeyExpression> {
        match self {
            Keys::Parsed(expr) => Some(expr),
            Keys::Direct(_) => None,
        }
    }
}

impl fmt::Display for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Keys::Direct(raw) => write!(f, "'{raw}'"),
            Keys::Parsed(expr) => write!(f, "{expr}"),
        }
    }
}

/// Parse raw keyword input.
pub fn parse_keys(raw: &str, mode: ParseMode, conjunction: Conjunction) -> Keys {
    match mode {
        ParseMode::Direct => Keys::Direct(raw.to_string()),
        ParseMode::Single => Keys::Parsed(KeyExpression::new(
            conjunction,
            vec![KeyTerm::Term(raw.to_string())],
        )),
        ParseMode::Terms => Keys::Parsed(KeyExpression::new(conjunction, parse_terms(raw))),
    }
}

/// Split on single spaces, grouping `"quoted phrases"`.
///
/// A phrase still open at the end of input is emitted as it stands.
fn parse_terms(raw: &str) -> Vec<KeyTerm> {
    let mut terms: Vec<String> = Vec::new();
    let mut phrase = String::new();
    let mut quoted = false;

    for token in raw.split(' ') {
        if token.is_empty() {
            continue;
        }
        if quoted {
            phrase.push(' ');
            match token.strip_suffix('"') {
                Some(closing) => {
                    phrase.push_str(closing);
                    terms.push(std::mem::take(&mut phrase));
                    quoted = false;
                }
                None => phrase.push_str(token),
            }
        } else if let Some(rest) = token.strip_prefix('"') {
            match rest.strip_suffix('"') {
                Some(inner) if token.len() > 1 => terms.push(inner.to_string()),
                _ => {
                    phrase = rest.to_string();
                    quoted = true;
                }
            }
        } else {
            terms.push(token.to_string());
        }
    }
    if quoted {
        terms.push(phrase);
    }

    terms
        .into_iter()
        .filter(|t| !t.is_empty())
        .map(KeyTerm::Term)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(raw: &str) -> Vec<String> {
        match parse_keys(raw, ParseMode::Terms, Conjunction::And) {
            Keys::Parsed(expr) => expr.flatten().into_iter().map(String::from).collect(),
            Keys::Direct(_) => panic!("terms mode must produce an expression"),
        }
    }

    #[test]
    fn test_quoted_phrase() {
        assert_eq!(terms("\"hello world\" foo"), vec!["hello world", "foo"]);
    }

    #[test]
    fn test_unterminated_quote_is_still_a_phrase() {
        assert_eq!(terms("a \"b"), vec!["a", "b"]);
        assert_eq!(terms("a \"b c"), vec!["a", "b c"]);
    }

    #[test]
    fn test_consecutive_spaces_collapse() {
        assert_eq!(terms("  foo   bar "), vec!["foo", "bar"]);
        assert_eq!(terms("\"foo    bar\""), vec!["foo bar"]);
    }

    #[test]
    fn test_single_token_phrase() {
        assert_eq!(terms("\"foo\" bar"), vec!["foo", "bar"]);
    }

    #[test]
    fn test_empty_phrases_are_dropped() {
        assert_eq!(terms("\"\" foo"), vec!["foo"]);
        assert_eq!(terms("foo \""), vec!["foo"]);
        assert!(terms("").is_empty());
    }

    #[test]
    fn test_lone_closing_quote_keeps_separator() {
        // The closing quote token contributes its separating space.
        assert_eq!(terms("\"a \""), vec!["a "]);
    }

    #[test]
    fn test_inner_quotes_are_literal() {
        assert_eq!(terms("it\"s fine"), vec!["it\"s", "fine"]);
    }

    #[test]
    fn test_terms_carry_conjunction() {
        let keys = parse_keys("a b", ParseMode::Terms, Conjunction::Or);
        assert_eq!(keys.as_expression().unwrap().conjunction, Conjunction::Or);
    }

    #[test]
    fn test_single_mode() {
        let keys = parse_keys("a b", ParseMode::Single, Conjunction::Or);
        assert_eq!(
            keys,
            Keys::Parsed(KeyExpression::new(Conjunction::Or, vec!["a b".into()]))
        );
    }

    #[test]
    fn test_direct_mode() {
        let raw = "title:(foo OR \"bar";
        assert_eq!(
            parse_keys(raw, ParseMode::Direct, Conjunction::And),
            Keys::Direct(raw.to_string())
        );
    }

    #[test]
    fn test_parse_mode_from_str() {
        assert_eq!(" Terms ".parse::<ParseMode>().unwrap(), ParseMode::Terms);
        assert!("complex".parse::<ParseMode>().is_err());
        assert_eq!(parse_modes().len(), 3);
    }

    #[test]
    fn test_expression_display() {
        let expr = KeyExpression::new(
            Conjunction::And,
            vec![
                "a".into(),
                KeyTerm::Group(KeyExpression::new(Conjunction::Or, vec!["b".into(), "c".into()])),
            ],
        );
        assert_eq!(expr.to_string(), "AND('a', OR('b', 'c'))");
    }
}
