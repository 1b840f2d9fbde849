//! Execution lifecycle of a query: ordering, idempotence, abort paths and
//! failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use halberd::backend::SearchBackend;
use halberd::context::SearchContext;
use halberd::error::{HalberdError, Result};
use halberd::index::SearchIndex;
use halberd::processor::{Processor, ProcessorChain};
use halberd::query::{Options, Query, ResultItem, ResultSet};

/// Backend returning a fixed item and recording every call.
#[derive(Debug, Default)]
struct CountingBackend {
    searches: AtomicUsize,
    fail: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl SearchBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn search(&self, query: &mut Query) -> Result<()> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push("search".to_string());
        if self.fail {
            return Err(HalberdError::backend("server unavailable"));
        }
        let results = query.results_mut();
        results.add_result_item(ResultItem::new("node/1").with_score(1.5));
        results.set_result_count(1);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CountingProcessor {
    pre: AtomicUsize,
    post: AtomicUsize,
    log: Arc<Mutex<Vec<String>>>,
}

impl Processor for CountingProcessor {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn preprocess_search_query(&self, _query: &mut Query) -> Result<()> {
        self.pre.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push("preprocess".to_string());
        Ok(())
    }

    fn postprocess_search_results(&self, _results: &mut ResultSet) -> Result<()> {
        self.post.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push("postprocess".to_string());
        Ok(())
    }
}

struct Fixture {
    backend: Arc<CountingBackend>,
    processor: Arc<CountingProcessor>,
    context: SearchContext,
    index: Arc<SearchIndex>,
    log: Arc<Mutex<Vec<String>>>,
}

impl Fixture {
    fn new(fail: bool) -> Self {
        let log = Arc::new(Mutex::new(Vec::new()));
        let backend = Arc::new(CountingBackend {
            fail,
            log: log.clone(),
            ..Default::default()
        });
        let processor = Arc::new(CountingProcessor {
            log: log.clone(),
            ..Default::default()
        });
        let index = Arc::new(
            SearchIndex::new("content")
                .with_server(backend.clone())
                .with_processors(ProcessorChain::new().add_processor(processor.clone())),
        );

        let context = SearchContext::new();
        let query_log = log.clone();
        context.events().on_query_alter(None, 0, move |_query| {
            query_log.lock().push("query_alter".to_string());
            Ok(())
        });
        let results_log = log.clone();
        context.events().on_results_alter(None, 0, move |_results| {
            results_log.lock().push("results_alter".to_string());
            Ok(())
        });

        Fixture {
            backend,
            processor,
            context,
            index,
            log,
        }
    }

    fn query(&self) -> Query {
        Query::new(self.index.clone(), &self.context, Options::new()).unwrap()
    }

    fn searches(&self) -> usize {
        self.backend.searches.load(Ordering::SeqCst)
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

#[test]
fn test_stages_run_in_order() {
    let fixture = Fixture::new(false);
    let mut query = fixture.query();
    query.keys(Some("foo"));
    query.execute().unwrap();

    assert_eq!(
        fixture.log(),
        vec![
            "preprocess",
            "query_alter",
            "search",
            "postprocess",
            "results_alter"
        ]
    );
}

#[test]
fn test_execute_runs_once() {
    let fixture = Fixture::new(false);
    let mut query = fixture.query();

    let first: *const ResultSet = query.execute().unwrap();
    let second: *const ResultSet = query.execute().unwrap();

    assert!(std::ptr::eq(first, second));
    assert!(std::ptr::eq(second, query.results()));
    assert_eq!(query.results().result_count(), 1);
    assert_eq!(fixture.searches(), 1);
    assert_eq!(fixture.processor.pre.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.processor.post.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.log().len(), 5);
    assert!(query.has_executed());
}

#[test]
fn test_pre_execute_runs_once() {
    let fixture = Fixture::new(false);
    let mut query = fixture.query();
    query.pre_execute().unwrap();
    query.pre_execute().unwrap();
    query.execute().unwrap();

    assert_eq!(fixture.processor.pre.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.searches(), 1);
}

#[test]
fn test_results_are_cached() {
    let fixture = Fixture::new(false);
    let mut options = Options::new();
    options.insert("search id".to_string(), "views:frontpage".into());
    let mut query = Query::new(fixture.index.clone(), &fixture.context, options).unwrap();
    let results = query.execute().unwrap().clone();

    let cache = fixture.context.results_cache();
    assert_eq!(cache.get_results(&query.id()), Some(results.clone()));
    assert_eq!(cache.get_results_for_search("views:frontpage"), Some(results));
    assert_eq!(query.results().search_id(), "views:frontpage");
}

#[test]
fn test_disabled_index_cannot_be_queried() {
    let index = Arc::new(
        SearchIndex::new("content")
            .with_label("Content")
            .with_status(false),
    );
    let result = Query::new(index, &SearchContext::new(), Options::new());
    assert!(matches!(result, Err(HalberdError::InvalidQuery(_))));
}

#[test]
fn test_empty_language_list_skips_search() {
    let fixture = Fixture::new(false);
    let mut query = fixture.query();
    query.set_languages(Some(Vec::new()));

    let results = query.execute().unwrap();
    assert_eq!(results.result_count(), 0);
    assert!(results.is_empty());
    assert_eq!(fixture.searches(), 0);
    // Nothing was searched, but the results were still post-processed.
    assert_eq!(fixture.processor.pre.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.processor.post.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.log(), vec!["postprocess", "results_alter"]);
    assert!(
        fixture
            .context
            .results_cache()
            .get_results(&query.id())
            .is_some()
    );
}

#[test]
fn test_abort_from_listener() {
    let fixture = Fixture::new(false);
    fixture
        .context
        .events()
        .on_query_alter(Some("abortable"), 0, |query| {
            query.abort_with_message("x");
            Ok(())
        });

    let mut query = fixture.query();
    query.add_tag("abortable");
    let results = query.execute().unwrap();

    assert_eq!(results.result_count(), 0);
    assert!(query.was_aborted());
    assert_eq!(query.abort_message(), Some("x"));
    assert_eq!(fixture.searches(), 0);
    assert_eq!(fixture.processor.pre.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.processor.post.load(Ordering::SeqCst), 1);
    assert!(
        fixture
            .context
            .results_cache()
            .get_results(&query.id())
            .is_some()
    );
}

#[test]
fn test_abort_before_execute_skips_preprocessing() {
    let fixture = Fixture::new(false);
    let mut query = fixture.query();
    query.abort();
    query.execute().unwrap();

    assert_eq!(fixture.processor.pre.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.processor.post.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.searches(), 0);
    assert_eq!(query.abort_message(), None);
}

#[test]
fn test_backend_failure_leaves_stale_results() {
    let fixture = Fixture::new(true);
    let mut query = fixture.query();

    let err = query.execute().unwrap_err();
    assert!(matches!(err, HalberdError::Backend(_)));
    assert!(query.has_executed());
    assert_eq!(fixture.processor.post.load(Ordering::SeqCst), 0);

    // Legacy behaviour: a retry returns the partial results untouched.
    let retried = query.execute().unwrap();
    assert_eq!(retried.result_count(), 0);
    assert_eq!(fixture.searches(), 1);
}

#[test]
fn test_listener_failure_propagates() {
    let fixture = Fixture::new(false);
    fixture.context.events().on_query_alter(None, 10, |_query| {
        Err(HalberdError::processor("listener refused the query"))
    });

    let mut query = fixture.query();
    let err = query.execute().unwrap_err();
    assert!(matches!(err, HalberdError::Processor(_)));
    assert_eq!(fixture.searches(), 0);

    assert!(query.execute().unwrap().is_empty());
    assert_eq!(fixture.searches(), 0);
}

#[test]
fn test_results_listener_changes_are_cached() {
    let fixture = Fixture::new(false);
    fixture.context.events().on_results_alter(None, 0, |results| {
        results.add_warning("index is outdated");
        Ok(())
    });

    let mut query = fixture.query();
    query.execute().unwrap();

    let cached = fixture
        .context
        .results_cache()
        .get_results(&query.id())
        .unwrap();
    assert_eq!(cached.warnings(), &["index is outdated".to_string()]);
    assert_eq!(query.results().warnings(), cached.warnings());
}

#[test]
fn test_missing_server_is_reported() {
    let index = Arc::new(SearchIndex::new("content"));
    let mut query = Query::new(index, &SearchContext::new(), Options::new()).unwrap();
    assert!(matches!(query.execute(), Err(HalberdError::Backend(_))));
}
