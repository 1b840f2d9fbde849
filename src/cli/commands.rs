//! Command implementations for Halberd CLI.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};

use crate::backend::SearchBackend;
use crate::backend::memory::{IndexedItem, MemoryBackend};
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::QueryConfig;
use crate::context::SearchContext;
use crate::error::{HalberdError, Result};
use crate::index::SearchIndex;
use crate::processor::ProcessorChain;
use crate::processor::ignore_case::IgnoreCase;
use crate::processor::ignore_characters::IgnoreCharacters;
use crate::query::{OPTION_CONJUNCTION, OPTION_SEARCH_ID, Options, Query, parse_keys};
use crate::value::Value;

/// Execute a CLI command.
pub fn execute_command(args: HalberdArgs) -> Result<()> {
    match &args.command {
        Command::Search(search_args) => search(search_args.clone(), &args),
        Command::ParseKeys(parse_args) => parse_keys_command(parse_args.clone(), &args),
    }
}

/// Load items from a JSON array, or from one JSON object per line.
pub fn load_items<P: AsRef<Path>>(path: P) -> Result<Vec<IndexedItem>> {
    let content = fs::read_to_string(path.as_ref())?;
    if content.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(&content)?);
    }

    let mut items = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let item: IndexedItem = serde_json::from_str(line).map_err(|e| {
            HalberdError::other(format!("invalid item on line {}: {e}", line_num + 1))
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Build the query described by the search arguments on top of `backend`.
pub fn build_query(args: &SearchArgs, backend: Arc<dyn SearchBackend>) -> Result<Query> {
    let config = match &args.config {
        Some(path) => QueryConfig::from_file(path)?,
        None => QueryConfig::default(),
    };
    let context = SearchContext::new().with_config(config);

    let mut processors = ProcessorChain::new();
    if let Some(pattern) = &args.ignore_characters {
        processors = processors.add_processor(Arc::new(IgnoreCharacters::new(pattern)?));
    }
    if args.ignore_case {
        processors = processors.add_processor(Arc::new(IgnoreCase::new()));
    }
    let index = SearchIndex::new(args.index_id.as_str())
        .with_server(backend)
        .with_processors(processors);

    let mut options = Options::new();
    if let Some(conjunction) = args.conjunction {
        options.insert(
            OPTION_CONJUNCTION.to_string(),
            Value::from(conjunction.as_str()),
        );
    }
    if let Some(search_id) = &args.search_id {
        options.insert(OPTION_SEARCH_ID.to_string(), Value::from(search_id.as_str()));
    }

    let mut query = Query::new(Arc::new(index), &context, options)?;
    if let Some(parse_mode) = args.parse_mode {
        query.set_parse_mode(parse_mode);
    }
    query.keys(args.keys.as_deref());
    if !args.fields.is_empty() {
        query.set_fulltext_fields(Some(args.fields.clone()));
    }
    if !args.languages.is_empty() {
        query.set_languages(Some(args.languages.clone()));
    }
    for filter in &args.filters {
        query.add_condition(filter.field.as_str(), filter.value.clone(), filter.operator);
    }
    for sort in &args.sorts {
        query.sort(sort.field.as_str(), sort.order.as_str());
    }
    if args.offset.is_some() || args.limit.is_some() {
        query.range(args.offset, args.limit);
    }
    for tag in &args.tags {
        query.add_tag(tag.as_str());
    }
    Ok(query)
}

/// Search items loaded from a file.
fn search(args: SearchArgs, cli_args: &HalberdArgs) -> Result<()> {
    let items = load_items(&args.items_file)?;
    info!(
        "loaded {} item(s) from {}",
        items.len(),
        args.items_file.display()
    );

    let backend = Arc::new(MemoryBackend::new());
    backend.index_items(items);
    let mut query = build_query(&args, backend)?;

    let start_time = Instant::now();
    query.execute()?;
    let duration = start_time.elapsed();
    debug!("query {} executed in {duration:?}", query.id());

    let explained = args.explain.then(|| query.to_string());
    output_result(
        "Search completed",
        &SearchOutput::new(query.results(), duration.as_millis() as u64, explained),
        cli_args,
    )
}

/// Print how keys are parsed.
fn parse_keys_command(args: ParseKeysArgs, cli_args: &HalberdArgs) -> Result<()> {
    let keys = parse_keys(&args.keys, args.parse_mode, args.conjunction);
    output_result(
        "Keys parsed",
        &ParsedKeysOutput {
            raw: args.keys,
            parse_mode: args.parse_mode.to_string(),
            conjunction: args.conjunction.to_string(),
            keys,
        },
        cli_args,
    )
}
