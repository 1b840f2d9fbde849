//! Criterion benchmarks for Halberd.
//!
//! Covers keyword parsing and full query execution over the in-memory
//! backend.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use halberd::backend::memory::{IndexedItem, MemoryBackend};
use halberd::context::SearchContext;
use halberd::index::SearchIndex;
use halberd::processor::ProcessorChain;
use halberd::processor::ignore_case::IgnoreCase;
use halberd::query::{Conjunction, Operator, Options, ParseMode, Query, parse_keys};

const WORDS: [&str; 16] = [
    "search", "engine", "full", "text", "index", "query", "document", "field", "term", "phrase",
    "boolean", "relevance", "score", "analysis", "ranking", "filtering",
];

/// Generate test items for benchmarking.
fn generate_items(count: usize) -> Vec<IndexedItem> {
    (0..count)
        .map(|i| {
            let title: Vec<&str> = (0..8).map(|j| WORDS[(i * 7 + j * 3) % WORDS.len()]).collect();
            IndexedItem::new(i.to_string())
                .with_field("title", title.join(" "))
                .with_field("status", (i % 2) as i64)
                .with_field("created", (i % 365) as i64)
        })
        .collect()
}

fn bench_parse_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_keys");
    let inputs = [
        ("simple", "search engine ranking"),
        ("phrases", "\"full text\" search \"boolean query\" score"),
        ("unterminated", "index \"document field term phrase"),
    ];

    for (name, raw) in inputs {
        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_with_input(BenchmarkId::new("terms", name), raw, |b, raw| {
            b.iter(|| parse_keys(black_box(raw), ParseMode::Terms, Conjunction::And))
        });
    }
    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");

    for size in [100usize, 1_000] {
        let backend = Arc::new(MemoryBackend::new());
        backend.index_items(generate_items(size));
        let index = Arc::new(
            SearchIndex::new("bench")
                .with_server(backend)
                .with_processors(ProcessorChain::new().add_processor(Arc::new(IgnoreCase::new()))),
        );
        let context = SearchContext::new();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("memory", size), &size, |b, _| {
            b.iter(|| {
                let mut query = Query::new(index.clone(), &context, Options::new()).unwrap();
                query
                    .keys(Some("Search \"full text\""))
                    .add_condition("status", 1, Operator::Equal)
                    .sort("created", "DESC")
                    .range(Some(0), Some(10));
                black_box(query.execute().unwrap().result_count())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse_keys, bench_execute);
criterion_main!(benches);
