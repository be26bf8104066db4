//! Benchmarks for the lexical index (indexing and BM25 search).
//!
//! Run with: `cargo bench -p mailsearch-core --bench lexical`
//!
//! Measures:
//! - Bulk indexing throughput
//! - BM25 query latency as the mailbox grows
//! - Filtered queries, which scan every document to build the candidate set
//! - RRF fusion of two ranked lists

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mailsearch_core::query::parse_query;
use mailsearch_core::search::fusion::{reciprocal_rank_fusion, RRF_K};
use mailsearch_core::search::{EmailDocument, InvertedIndex, MatchType, SearchOptions, SearchResult};

// =============================================================================
// Test Data Generation
// =============================================================================

fn sample_email(id: usize) -> EmailDocument {
    let topics = [
        "quarterly budget review and forecast adjustments",
        "offsite travel logistics and hotel booking",
        "standup notes with blockers and action items",
        "customer invoice dispute and refund request",
        "hiring pipeline update for the platform team",
        "security incident postmortem and remediation",
    ];
    let topic = topics[id % topics.len()];
    let mut doc = EmailDocument::new(
        format!("msg-{id}"),
        &format!("Re: {topic}"),
        &format!(
            "Hi team, following up on the {topic}. Message {id} summarizes where \
             we landed and what still needs an owner. Please reply with comments \
             before the end of the week so we can close this out."
        ),
    );
    doc.from = format!("sender{}@example.com", id % 37);
    doc.to = vec!["team@example.com".to_string()];
    doc.folder = if id % 5 == 0 { "archive" } else { "inbox" }.to_string();
    doc.is_read = id % 3 == 0;
    doc
}

fn build_index(size: usize) -> InvertedIndex {
    let mut index = InvertedIndex::new();
    index.index_documents((0..size).map(sample_email));
    index
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_indexing(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexical_indexing");
    group.sample_size(20);

    for size in [100, 1_000, 5_000] {
        let docs: Vec<EmailDocument> = (0..size).map(sample_email).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &docs, |b, docs| {
            b.iter(|| {
                let mut index = InvertedIndex::new();
                index.index_documents(docs.iter().cloned());
                black_box(index.len())
            });
        });
    }
    group.finish();
}

fn bench_bm25_search_varying_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("bm25_search");
    let query = parse_query("budget forecast hotel");
    let options = SearchOptions::default();

    for size in [100, 1_000, 10_000] {
        let index = build_index(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(index.search(black_box(&query), &options)));
        });
    }
    group.finish();
}

fn bench_filtered_search(c: &mut Criterion) {
    let index = build_index(10_000);
    let query = parse_query("is:unread budget");
    let options = SearchOptions {
        folder: Some("inbox".to_string()),
        ..SearchOptions::default()
    };

    c.bench_function("bm25_search_filtered_10k", |b| {
        b.iter(|| black_box(index.search(black_box(&query), &options)));
    });
}

fn bench_fusion(c: &mut Criterion) {
    let ranked = |offset: usize, match_type: MatchType| -> Vec<SearchResult> {
        (0..300)
            .map(|i| SearchResult {
                document: sample_email(i + offset),
                score: 1.0 / (i + 1) as f64,
                match_type,
                highlights: Vec::new(),
            })
            .collect()
    };
    let semantic = ranked(0, MatchType::Semantic);
    let lexical = ranked(150, MatchType::Lexical);

    c.bench_function("rrf_fusion_300x300", |b| {
        b.iter(|| {
            black_box(reciprocal_rank_fusion(
                semantic.clone(),
                lexical.clone(),
                0.5,
                RRF_K,
                10,
            ))
        });
    });
}

criterion_group!(
    benches,
    bench_indexing,
    bench_bm25_search_varying_size,
    bench_filtered_search,
    bench_fusion
);
criterion_main!(benches);
