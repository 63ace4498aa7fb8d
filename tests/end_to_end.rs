// Index a small repository, edit one file and re-index incrementally

use std::sync::Arc;

use repoqa::backend::{Embedder, HashingEmbedder};
use repoqa::index::store::VectorStore;
use repoqa::index::CodeFile;
use repoqa::indexer::changes::{detect_changes, FingerprintTable, FINGERPRINTS_FILE};
use repoqa::indexer::chunker::Chunker;
use repoqa::indexer::{Indexer, SyncOutcome, UpdateOutcome};
use repoqa::progress::NoProgress;
use repoqa::query::HybridSearch;
use tempfile::tempdir;

const DIM: usize = 64;

fn python_file(path: &str, prefix: &str, lines: usize) -> CodeFile {
    let content = (1..=lines)
        .map(|i| format!("{}_{} = compute_{}()", prefix, i, i))
        .collect::<Vec<_>>()
        .join("\n");
    CodeFile::new(path, content)
}

fn setup(dir: &std::path::Path) -> (Arc<VectorStore>, Arc<dyn Embedder>, Indexer) {
    let store = Arc::new(VectorStore::new(dir, DIM));
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(DIM));
    let indexer = Indexer::new(Arc::clone(&store), Arc::clone(&embedder), Chunker::default(), 8);
    (store, embedder, indexer)
}

#[test]
fn test_incremental_update_replaces_only_changed_file() {
    let dir = tempdir().unwrap();
    let (store, _embedder, indexer) = setup(dir.path());

    let a = python_file("a.py", "alpha", 60);
    let b = python_file("b.py", "beta", 10);
    let files = vec![a, b.clone()];

    assert_eq!(
        indexer.sync(&files, &NoProgress).unwrap(),
        SyncOutcome::Rebuilt { total_chunks: 3 }
    );

    let snapshot = store.snapshot().unwrap();
    let layout: Vec<(&str, usize, usize)> = snapshot
        .metadata()
        .iter()
        .map(|c| (c.path.as_str(), c.start_line, c.end_line))
        .collect();
    assert_eq!(layout, vec![("a.py", 1, 50), ("a.py", 41, 60), ("b.py", 1, 10)]);
    let b_vector = snapshot.vector(2).to_vec();

    // Modify a.py only
    let edited = vec![python_file("a.py", "omega", 60), b];
    let previous = FingerprintTable::load(dir.path().join(FINGERPRINTS_FILE));
    let (changes, _) = detect_changes(&edited, &previous);
    assert_eq!(changes.changed.iter().map(String::as_str).collect::<Vec<_>>(), vec!["a.py"]);
    assert!(changes.new.is_empty());
    assert!(changes.deleted.is_empty());

    assert_eq!(
        indexer.sync(&edited, &NoProgress).unwrap(),
        SyncOutcome::Incremental(UpdateOutcome::Updated {
            added_chunks: 2,
            removed_chunks: 2,
            total_chunks: 3,
        })
    );

    // b.py is untouched, only relocated ahead of the new a.py rows
    let snapshot = store.snapshot().unwrap();
    let b_row = snapshot
        .metadata()
        .iter()
        .position(|c| c.path == "b.py")
        .unwrap();
    assert_eq!(snapshot.metadata()[b_row].start_line, 1);
    assert_eq!(snapshot.metadata()[b_row].end_line, 10);
    assert_eq!(snapshot.vector(b_row), b_vector.as_slice());
    assert!(snapshot
        .metadata()
        .iter()
        .filter(|c| c.path == "a.py")
        .all(|c| c.content.starts_with("omega_")));

    // Nothing changed since: no-op
    assert_eq!(
        indexer.sync(&edited, &NoProgress).unwrap(),
        SyncOutcome::Incremental(UpdateOutcome::Unchanged)
    );
}

#[test]
fn test_index_survives_reopen_and_serves_search() {
    let dir = tempdir().unwrap();
    {
        let (_store, _embedder, indexer) = setup(dir.path());
        let files = vec![
            CodeFile::new("server.py", "def handle_request(req):\n    return route_table[req.path]\n"),
            CodeFile::new("db.py", "def open_connection(url):\n    return pool.get(url)\n"),
            CodeFile::new("cli.py", "def parse_arguments(argv):\n    return parser.parse(argv)\n"),
        ];
        indexer.rebuild(&files, &NoProgress).unwrap();
    }

    let (store, embedder, _indexer) = setup(dir.path());
    assert!(!store.is_loaded());

    let search = HybridSearch::new(store, embedder);
    let results = search.search("open_connection", 2, 0.0).unwrap();
    assert_eq!(results[0].path, "db.py");
    assert!(results.len() <= 2);

    let semantic = search.semantic_search("def parse_arguments(argv):\n    return parser.parse(argv)", 1).unwrap();
    assert_eq!(semantic[0].path, "cli.py");
}
