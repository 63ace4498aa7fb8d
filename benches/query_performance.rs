//! Search latency over synthetic repositories of increasing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use repoqa::backend::{Embedder, HashingEmbedder};
use repoqa::index::store::VectorStore;
use repoqa::index::CodeFile;
use repoqa::indexer::chunker::Chunker;
use repoqa::indexer::Indexer;
use repoqa::progress::NoProgress;
use repoqa::query::{HybridSearch, KeywordIndex};

const DIM: usize = 384;

fn synthetic_files(count: usize) -> Vec<CodeFile> {
    let topics = ["parser", "router", "cache", "session", "schema", "worker"];
    (0..count)
        .map(|i| {
            let topic = topics[i % topics.len()];
            let content = (0..120)
                .map(|line| format!("fn {}_step_{}_{}(input: &str) -> usize {{ input.len() + {} }}", topic, i, line, line))
                .collect::<Vec<_>>()
                .join("\n");
            CodeFile::new(format!("src/{}_{}.rs", topic, i), content)
        })
        .collect()
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for &files in &[10usize, 100] {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(VectorStore::new(dir.path(), DIM));
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(DIM));
        let indexer = Indexer::new(Arc::clone(&store), Arc::clone(&embedder), Chunker::default(), 32);
        indexer.rebuild(&synthetic_files(files), &NoProgress).unwrap();

        let search = HybridSearch::new(store, embedder);
        // Warm the keyword index
        search.search("cache", 5, 0.7).unwrap();

        group.bench_with_input(BenchmarkId::new("hybrid", files), &search, |b, search| {
            b.iter(|| search.search(black_box("cache session lookup"), 5, 0.7).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("semantic", files), &search, |b, search| {
            b.iter(|| search.semantic_search(black_box("cache session lookup"), 5).unwrap())
        });
    }

    group.finish();
}

fn bench_keyword_build(c: &mut Criterion) {
    let chunks = Chunker::default().chunk_all(&synthetic_files(100));
    c.bench_function("keyword_index_build", |b| b.iter(|| KeywordIndex::build(black_box(&chunks))));
}

criterion_group!(benches, bench_search, bench_keyword_build);
criterion_main!(benches);
