//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{HalberdArgs, OutputFormat};
use crate::error::Result;
use crate::query::{Keys, ResultItem, ResultSet};
use crate::value::Value;

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchOutput {
    pub search_id: String,
    pub result_count: usize,
    pub items: Vec<ResultItem>,
    pub ignored_search_keys: Vec<String>,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
    /// Rendering of the executed query, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl SearchOutput {
    pub fn new(results: &ResultSet, duration_ms: u64, query: Option<String>) -> Self {
        SearchOutput {
            search_id: results.search_id().to_string(),
            result_count: results.result_count(),
            items: results.result_items().to_vec(),
            ignored_search_keys: results.ignored_search_keys().to_vec(),
            warnings: results.warnings().to_vec(),
            duration_ms,
            query,
        }
    }
}

/// Result structure for keyword parsing.
#[derive(Debug, Serialize, Deserialize)]
pub struct ParsedKeysOutput {
    pub raw: String,
    pub parse_mode: String,
    pub conjunction: String,
    pub keys: Keys,
}

/// Human-readable rendering of a command result.
pub trait HumanOutput {
    fn write_human(&self, args: &HalberdArgs) -> Vec<String>;
}

impl HumanOutput for SearchOutput {
    fn write_human(&self, args: &HalberdArgs) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(query) = &self.query {
            lines.push("Query:".to_string());
            lines.push("══════".to_string());
            lines.extend(query.lines().map(str::to_string));
            lines.push(String::new());
        }

        lines.push("Search Results:".to_string());
        lines.push("═══════════════".to_string());
        for (i, item) in self.items.iter().enumerate() {
            lines.push(String::new());
            lines.push(format!(
                "Result {}: {} (Score: {:.3})",
                i + 1,
                item.id(),
                item.score()
            ));
            lines.push("─────────────".to_string());
            for (name, value) in item.fields() {
                lines.push(format!("{name}: {}", format_value(value)));
            }
        }
        lines.push(String::new());
        lines.push(format!("Total results: {}", self.result_count));

        if !self.ignored_search_keys.is_empty() {
            lines.push(format!(
                "Ignored keys: {}",
                self.ignored_search_keys.join(", ")
            ));
        }
        for warning in &self.warnings {
            lines.push(format!("Warning: {warning}"));
        }
        if args.verbosity() > 1 {
            lines.push(format!("Search id: {}", self.search_id));
            lines.push(format!("Search time: {}ms", self.duration_ms));
        }
        lines
    }
}

impl HumanOutput for ParsedKeysOutput {
    fn write_human(&self, args: &HalberdArgs) -> Vec<String> {
        let mut lines = Vec::new();
        if args.verbosity() > 1 {
            lines.push(format!("Raw keys: '{}'", self.raw));
            lines.push(format!("Parse mode: {}", self.parse_mode));
            lines.push(format!("Conjunction: {}", self.conjunction));
        }
        lines.push(self.keys.to_string());
        lines
    }
}

/// Output a result in the specified format.
pub fn output_result<T>(message: &str, result: &T, args: &HalberdArgs) -> Result<()>
where
    T: Serialize + HumanOutput,
{
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 1 {
                println!("{message}");
                println!();
            }
            for line in result.write_human(args) {
                println!("{line}");
            }
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &HalberdArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a field value for display; text is shown unquoted.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        Value::List(items) => items.iter().map(format_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}
