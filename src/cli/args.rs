//! Command line argument parsing for Halberd CLI using clap.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::processor::ignore_characters::DEFAULT_IGNORABLE;
use crate::query::{Conjunction, Operator, ParseMode, SortOrder};
use crate::value::Value;

/// Halberd - build, run and inspect search queries
#[derive(Parser, Debug, Clone)]
#[command(name = "halberd")]
#[command(about = "Build, run and inspect search queries")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct HalberdArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl HalberdArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Search items loaded from a JSON file
    Search(SearchArgs),

    /// Show how search keys are parsed
    #[command(name = "parse-keys")]
    ParseKeys(ParseKeysArgs),
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Items file: a JSON array or one JSON object per line
    #[arg(value_name = "ITEMS_FILE")]
    pub items_file: PathBuf,

    /// Search keys (omit for a filter-only search)
    #[arg(value_name = "KEYS")]
    pub keys: Option<String>,

    /// Id of the in-memory index
    #[arg(long, default_value = "default")]
    pub index_id: String,

    /// Query configuration file (JSON)
    #[arg(long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// How to parse the keys (direct, single, terms)
    #[arg(short = 'm', long)]
    pub parse_mode: Option<ParseMode>,

    /// Conjunction between parsed terms (AND, OR)
    #[arg(short, long)]
    pub conjunction: Option<Conjunction>,

    /// Fulltext fields to search (comma-separated, default: all)
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Filter condition, e.g. `status=1`, `created>=2020`, `type in a,b`
    #[arg(short = 'F', long = "filter", value_parser = parse_filter)]
    pub filters: Vec<FilterArg>,

    /// Sort, e.g. `created:desc` (repeatable)
    #[arg(short, long = "sort", value_parser = parse_sort)]
    pub sorts: Vec<SortArg>,

    /// Languages to search (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub languages: Vec<String>,

    /// Offset for pagination
    #[arg(short, long)]
    pub offset: Option<usize>,

    /// Maximum number of results to return
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Tag added to the query (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Search id identifying the caller
    #[arg(long)]
    pub search_id: Option<String>,

    /// Lowercase keys before searching
    #[arg(long)]
    pub ignore_case: bool,

    /// Strip characters matching REGEX from keys (default: punctuation)
    #[arg(long, value_name = "REGEX", num_args = 0..=1, default_missing_value = DEFAULT_IGNORABLE)]
    pub ignore_characters: Option<String>,

    /// Print the query before its results
    #[arg(long)]
    pub explain: bool,
}

/// Arguments for parsing keys
#[derive(Parser, Debug, Clone)]
pub struct ParseKeysArgs {
    /// Keys to parse
    #[arg(value_name = "KEYS")]
    pub keys: String,

    /// Parse mode (direct, single, terms)
    #[arg(short = 'm', long, default_value = "terms")]
    pub parse_mode: ParseMode,

    /// Conjunction between parsed terms (AND, OR)
    #[arg(short, long, default_value = "AND")]
    pub conjunction: Conjunction,
}

/// A condition given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterArg {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

/// A sort given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortArg {
    pub field: String,
    pub order: SortOrder,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

const WORD_OPERATORS: [(&str, Operator); 4] = [
    ("not between ", Operator::NotBetween),
    ("between ", Operator::Between),
    ("not in ", Operator::NotIn),
    ("in ", Operator::In),
];

/// Parse `FIELD OP VALUE`. Symbolic operators may be written without
/// spaces; `in`, `not in`, `between` and `not between` must follow the
/// field and take a comma-separated list.
pub fn parse_filter(s: &str) -> Result<FilterArg, String> {
    if let Some((field, operator, rest)) = word_operator(s) {
        let values = rest
            .split(',')
            .map(|v| parse_scalar(v.trim()))
            .collect::<Vec<_>>();
        return filter(field, operator, Value::List(values));
    }

    let start = s
        .find(['<', '>', '=', '!'])
        .ok_or_else(|| format!("no operator in filter '{s}'"))?;
    let end = s[start..]
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '!'))
        .map_or(s.len(), |len| start + len);
    let operator = Operator::from_str(&s[start..end]).map_err(|e| e.to_string())?;
    filter(s[..start].trim(), operator, parse_scalar(s[end..].trim()))
}

// A word operator only counts right after the field token.
fn word_operator(s: &str) -> Option<(&str, Operator, &str)> {
    let (field, rest) = s.trim_start().split_once(char::is_whitespace)?;
    if field.contains(['<', '>', '=', '!']) {
        return None;
    }
    let rest = rest.trim_start();
    let lower = rest.to_ascii_lowercase();
    for (word, operator) in WORD_OPERATORS {
        if lower.starts_with(word) {
            return Some((field, operator, &rest[word.len()..]));
        }
    }
    None
}

fn filter(field: &str, operator: Operator, value: Value) -> Result<FilterArg, String> {
    if field.is_empty() {
        return Err("filter has no field".to_string());
    }
    Ok(FilterArg {
        field: field.to_string(),
        operator,
        value,
    })
}

/// Parse `FIELD[:ORDER]`; the order defaults to ascending.
pub fn parse_sort(s: &str) -> Result<SortArg, String> {
    let (field, order) = match s.rsplit_once(':') {
        Some((field, order)) => (field, SortOrder::normalize(order)),
        None => (s, SortOrder::Asc),
    };
    if field.trim().is_empty() {
        return Err(format!("sort '{s}' has no field"));
    }
    Ok(SortArg {
        field: field.trim().to_string(),
        order,
    })
}

fn parse_scalar(s: &str) -> Value {
    match s {
        "null" | "NULL" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(i) = s.parse::<i64>() {
                Value::Integer(i)
            } else if let Ok(f) = s.parse::<f64>() {
                Value::Float(f)
            } else {
                Value::Text(s.to_string())
            }
        }
    }
}
