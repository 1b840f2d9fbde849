//! Processors, tagged listeners and the in-memory backend working together.

use std::sync::Arc;

use parking_lot::Mutex;

use halberd::backend::memory::{FIELD_ID, IndexedItem, MemoryBackend};
use halberd::context::SearchContext;
use halberd::event::{EventDispatcher, EventKind};
use halberd::index::SearchIndex;
use halberd::processor::ProcessorChain;
use halberd::processor::ignore_case::IgnoreCase;
use halberd::processor::ignore_characters::IgnoreCharacters;
use halberd::query::{Conjunction, Keys, Operator, Options, ParseMode, Query};
use halberd::value::Value;

fn articles() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    backend.index_items(vec![
        IndexedItem::new("1")
            .with_language("en")
            .with_field("title", "Rust search engines")
            .with_field("body", "Search, search and search again.")
            .with_field("type", "article")
            .with_field("created", 2021),
        IndexedItem::new("2")
            .with_language("en")
            .with_field("title", "Cooking with rust-proof pans")
            .with_field("type", "page")
            .with_field("created", 2019),
        IndexedItem::new("3")
            .with_language("fr")
            .with_field("title", "Moteurs de recherche")
            .with_field("body", "Rust search")
            .with_field("type", "article")
            .with_field("created", 2023),
    ]);
    backend
}

fn index(backend: Arc<MemoryBackend>) -> Arc<SearchIndex> {
    let processors = ProcessorChain::new()
        .add_processor(Arc::new(IgnoreCharacters::punctuation().unwrap()))
        .add_processor(Arc::new(IgnoreCase::new()));
    Arc::new(
        SearchIndex::new("articles")
            .with_server(backend)
            .with_processors(processors),
    )
}

fn ids(query: &Query) -> Vec<String> {
    query
        .results()
        .iter()
        .map(|item| item.id().to_string())
        .collect()
}

#[test]
fn test_keys_are_processed_before_search() {
    let backend = articles();
    let context = SearchContext::new();
    let mut query = Query::new(index(backend), &context, Options::new()).unwrap();
    query.keys(Some("RUST! ?? \"Search engines\""));
    query.execute().unwrap();

    let expected = Keys::Parsed(halberd::query::KeyExpression::new(
        Conjunction::And,
        vec!["rust".into(), "search engines".into()],
    ));
    assert_eq!(query.get_keys(), Some(&expected));
    assert_eq!(query.original_keys(), Some("RUST! ?? \"Search engines\""));
    assert_eq!(query.results().ignored_search_keys(), &["??".to_string()]);
    assert_eq!(ids(&query), vec!["1"]);
}

#[test]
fn test_relevance_and_field_sorting() {
    let backend = articles();
    let context = SearchContext::new();

    let mut by_relevance = Query::new(index(backend.clone()), &context, Options::new()).unwrap();
    by_relevance.keys(Some("search"));
    by_relevance.execute().unwrap();
    assert_eq!(ids(&by_relevance), vec!["1", "3"]);
    assert_eq!(by_relevance.results().result_items()[0].score(), 4.0);

    let mut by_date = Query::new(index(backend), &context, Options::new()).unwrap();
    by_date
        .keys(Some("search"))
        .sort("created", "DESC")
        .sort(FIELD_ID, "ASC");
    by_date.execute().unwrap();
    assert_eq!(ids(&by_date), vec!["3", "1"]);
}

#[test]
fn test_or_conjunction_and_fulltext_fields() {
    let backend = articles();
    let context = SearchContext::new();
    let mut options = Options::new();
    options.insert("conjunction".to_string(), Value::from("OR"));

    let mut query = Query::new(index(backend), &context, options).unwrap();
    query
        .keys(Some("cooking recherche"))
        .sort(FIELD_ID, "asc")
        .set_fulltext_fields(Some(vec!["title".to_string()]));
    query.execute().unwrap();
    assert_eq!(ids(&query), vec!["2", "3"]);
}

#[test]
fn test_filters_languages_and_paging() {
    let backend = articles();
    let context = SearchContext::new();
    let mut query = Query::new(index(backend), &context, Options::new()).unwrap();

    let mut types = Query::create_condition_group(Conjunction::Or, Vec::<String>::new());
    types
        .add_condition("type", "article", Operator::Equal)
        .add_condition("created", 2019, Operator::LessThanOrEqual);
    query
        .add_condition_group(types)
        .add_condition("created", vec![2000, 2022], Operator::Between)
        .sort("created", "asc")
        .range(Some(1), Some(1));
    query.set_languages(Some(vec!["en".to_string()]));
    query.execute().unwrap();

    assert_eq!(query.results().result_count(), 2);
    assert_eq!(ids(&query), vec!["1"]);
}

#[test]
fn test_direct_keys_match_as_phrase() {
    let backend = articles();
    let context = SearchContext::new();
    let mut query = Query::new(index(backend), &context, Options::new()).unwrap();
    query
        .set_parse_mode(ParseMode::Direct)
        .keys(Some("Rust Search"));
    query.execute().unwrap();

    assert_eq!(query.get_keys(), Some(&Keys::Direct("rust search".to_string())));
    assert_eq!(ids(&query), vec!["1", "3"]);
}

#[test]
fn test_keys_are_idempotent() {
    let backend = articles();
    let context = SearchContext::new();
    let mut query = Query::new(index(backend), &context, Options::new()).unwrap();

    query.keys(Some("a \"b c\""));
    let first = query.get_keys().cloned();
    query.keys(Some("a \"b c\""));
    assert_eq!(query.get_keys().cloned(), first);

    query.set_parse_mode(ParseMode::Single).keys(Some("a \"b c\""));
    assert_eq!(
        query.get_keys().and_then(Keys::as_expression).unwrap().flatten(),
        vec!["a \"b c\""]
    );
}

#[test]
fn test_tagged_listeners_run_after_global_ones() {
    let events = Arc::new(EventDispatcher::new());
    let calls = Arc::new(Mutex::new(Vec::new()));

    for (tag, weight, name) in [
        (Some("views"), 0, "views"),
        (None, 5, "global-late"),
        (Some("unused"), -10, "unused"),
        (None, -5, "global-early"),
        (Some("facets"), 0, "facets"),
    ] {
        let calls = calls.clone();
        events.on_query_alter(tag, weight, move |_query| {
            calls.lock().push(name);
            Ok(())
        });
    }
    assert_eq!(events.listener_count(EventKind::QueryAlter, None), 2);
    assert_eq!(events.listener_count(EventKind::ResultsAlter, None), 0);

    let context = SearchContext::new().with_events(events);
    let mut query = Query::new(index(articles()), &context, Options::new()).unwrap();
    query.add_tag("facets").add_tag("views");
    query.execute().unwrap();

    assert_eq!(
        *calls.lock(),
        vec!["global-early", "global-late", "facets", "views"]
    );
}

#[test]
fn test_listener_can_alter_query_and_results() {
    let context = SearchContext::new();
    context.events().on_query_alter(Some("only_pages"), 0, |query| {
        query.add_condition("type", "page", Operator::Equal);
        Ok(())
    });
    context.events().on_results_alter(Some("only_pages"), 0, |results| {
        results.set_extra_data("altered", true);
        Ok(())
    });

    let mut query = Query::new(index(articles()), &context, Options::new()).unwrap();
    query.add_tag("only_pages");
    let results = query.execute().unwrap();

    assert_eq!(results.result_count(), 1);
    assert_eq!(results.result_items()[0].id(), "2");
    assert_eq!(results.get_extra_data("altered"), Some(&Value::Bool(true)));
}
