//! Saving queries and restoring them in a running application.

use std::sync::Arc;

use halberd::backend::memory::{IndexedItem, MemoryBackend};
use halberd::context::SearchContext;
use halberd::error::HalberdError;
use halberd::index::{MemoryIndexRegistry, SearchIndex};
use halberd::query::{Conjunction, Operator, Options, ParseMode, Query, SortOrder};
use halberd::value::Value;

fn setup() -> (SearchContext, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    backend.index_items(vec![
        IndexedItem::new("1")
            .with_language("en")
            .with_field("title", "Persisted queries")
            .with_field("status", 1),
        IndexedItem::new("2")
            .with_language("de")
            .with_field("title", "Gespeicherte queries")
            .with_field("status", 1),
    ]);

    let registry = Arc::new(MemoryIndexRegistry::new());
    registry.register(Arc::new(
        SearchIndex::new("content").with_server(backend.clone()),
    ));
    (SearchContext::new().with_registry(registry), backend)
}

fn build(context: &SearchContext) -> Query {
    let index = context
        .registry()
        .and_then(|registry| registry.load_index("content"))
        .unwrap();
    let mut query = Query::new(index, context, Options::new()).unwrap();

    let mut group = Query::create_condition_group(Conjunction::Or, ["facet:type"]);
    group
        .add_condition("status", 1, Operator::Equal)
        .add_condition("status", 2, Operator::Equal);
    query
        .keys(Some("\"persisted queries\""))
        .add_condition_group(group)
        .sort("title", "desc")
        .range(Some(0), Some(5))
        .add_tag("saved");
    query.set_languages(Some(vec!["en".to_string()]));
    query.set_option("custom", Value::object(vec![1u8, 2, 3]));
    query
}

#[test]
fn test_round_trip_restores_index() {
    let (context, _backend) = setup();
    let query = build(&context);

    let json = query.to_json().unwrap();
    let restored = Query::from_json(&json, Some(&context)).unwrap();

    assert_eq!(restored.id(), query.id());
    assert_eq!(restored.index().unwrap().id(), "content");
    assert_eq!(restored.get_keys(), query.get_keys());
    assert_eq!(restored.original_keys(), query.original_keys());
    assert_eq!(restored.parse_mode(), ParseMode::Terms);
    assert_eq!(restored.condition_group(), query.condition_group());
    assert_eq!(restored.sorts().get("title"), Some(SortOrder::Desc));
    assert_eq!(restored.limit(), Some(5));
    assert!(restored.has_tag("saved"));
    assert_eq!(restored.languages(), Some(&["en".to_string()][..]));
    assert!(!restored.has_executed());
}

#[test]
fn test_object_options_are_sanitized() {
    let (context, _backend) = setup();
    let query = build(&context);
    assert!(query.to_string().contains("'custom' => 'object ("));

    let restored = Query::from_json(&query.to_json().unwrap(), Some(&context)).unwrap();
    let tag = restored.get_option("custom").and_then(Value::as_str).unwrap();
    assert!(tag.starts_with("object ("));
    assert!(tag.ends_with("Vec<u8>)"));
}

#[test]
fn test_restored_query_executes() {
    let (context, backend) = setup();
    let query = build(&context);
    let mut restored = Query::from_json(&query.to_json().unwrap(), Some(&context)).unwrap();

    let results = restored.execute().unwrap();
    assert_eq!(results.result_count(), 1);
    assert_eq!(results.result_items()[0].id(), "1");
    assert_eq!(results.query_id(), query.id());
    assert_eq!(backend.search_count(), 1);
}

#[test]
fn test_executed_flag_survives_persistence() {
    let (context, backend) = setup();
    let mut query = build(&context);
    query.execute().unwrap();

    let mut restored = Query::from_json(&query.to_json().unwrap(), Some(&context)).unwrap();
    assert!(restored.has_executed());
    assert_eq!(restored.execute().unwrap(), query.results());
    assert_eq!(backend.search_count(), 1);
}

#[test]
fn test_unknown_index_stays_unresolved() {
    let (context, _backend) = setup();
    let query = build(&context);
    let persisted = query.to_persisted();

    let empty = SearchContext::new().with_registry(Arc::new(MemoryIndexRegistry::new()));
    let mut restored = Query::from_persisted(persisted.clone(), Some(&empty));
    assert_eq!(restored.index_id(), Some("content"));
    assert!(matches!(restored.index(), Err(HalberdError::MissingIndex(_))));
    assert!(matches!(restored.execute(), Err(HalberdError::MissingIndex(_))));

    let detached = Query::from_persisted(persisted, None);
    assert!(detached.to_string().starts_with("Index: content (not loaded)"));
}
