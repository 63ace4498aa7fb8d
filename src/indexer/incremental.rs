// Incremental index updates driven by content fingerprints

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::changes::{detect_changes, ChangeSet, FingerprintTable, FINGERPRINTS_FILE};
use super::chunker::Chunker;
use super::embed_chunks;
use crate::backend::Embedder;
use crate::error::{IndexError, Result};
use crate::index::store::VectorStore;
use crate::index::CodeFile;
use crate::progress::ProgressReporter;

/// Result of one update pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No file changed since the last pass; the store was not touched
    Unchanged,
    Updated {
        added_chunks: usize,
        removed_chunks: usize,
        total_chunks: usize,
    },
    /// There is no index to update; run a full rebuild
    NeedsRebuild,
    /// The pass failed before the store was replaced; run a full rebuild
    Failed(String),
}

impl UpdateOutcome {
    /// Whether the store now reflects the supplied files
    pub fn is_updated(&self) -> bool {
        matches!(self, UpdateOutcome::Unchanged | UpdateOutcome::Updated { .. })
    }
}

/// Applies file changes to an existing vector store
///
/// Only rows of changed, new or deleted files are recomputed; every other
/// row keeps its vector. The store is replaced once, after all new vectors
/// have been computed, so a failing embedder never leaves it half-updated.
pub struct IncrementalUpdater {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    batch_size: usize,
}

impl IncrementalUpdater {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>, chunker: Chunker, batch_size: usize) -> Self {
        Self {
            store,
            embedder,
            chunker,
            batch_size: batch_size.max(1),
        }
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn fingerprints_path(&self) -> PathBuf {
        self.store.index_dir().join(FINGERPRINTS_FILE)
    }

    /// Bring the store in line with `files`
    ///
    /// The fingerprint table is saved only when the store matches `files`
    /// afterwards, so it never runs ahead of the index.
    pub fn update(&self, files: &[CodeFile], progress: &dyn ProgressReporter) -> UpdateOutcome {
        let fingerprints_path = self.fingerprints_path();
        let previous = FingerprintTable::load(&fingerprints_path);

        progress.report(0.0, "Detecting changes");
        let (changes, current) = detect_changes(files, &previous);

        if changes.is_empty() {
            info!("No changes detected, index is up to date");
            progress.report(1.0, "Index is up to date");
            return UpdateOutcome::Unchanged;
        }

        info!(
            "Detected {} changed, {} new, {} deleted files",
            changes.changed.len(),
            changes.new.len(),
            changes.deleted.len()
        );

        let outcome = match self.apply(files, &changes, progress) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Incremental update failed: {}", e);
                return UpdateOutcome::Failed(e.to_string());
            }
        };

        if let UpdateOutcome::Updated { .. } = outcome {
            if let Err(e) = current.save(&fingerprints_path) {
                error!("Failed to save fingerprints to {}: {}", fingerprints_path.display(), e);
                return UpdateOutcome::Failed(e.to_string());
            }
            progress.report(1.0, "Index updated");
        }

        outcome
    }

    fn apply(
        &self,
        files: &[CodeFile],
        changes: &ChangeSet,
        progress: &dyn ProgressReporter,
    ) -> Result<UpdateOutcome> {
        let snapshot = match self.store.snapshot() {
            Ok(snapshot) => snapshot,
            Err(IndexError::IndexUnavailable) => {
                info!("No existing index, a full rebuild is required");
                return Ok(UpdateOutcome::NeedsRebuild);
            }
            Err(e) => return Err(e),
        };

        let to_index = changes.to_index();
        let to_evict = changes.to_evict();

        let new_chunks = self
            .chunker
            .chunk_all(files.iter().filter(|file| to_index.contains(file.path.as_str())));
        debug!("Chunked {} files into {} chunks", to_index.len(), new_chunks.len());

        let new_vectors = embed_chunks(self.embedder.as_ref(), &new_chunks, self.batch_size, progress)?;

        let mut vectors = Vec::with_capacity(snapshot.len() + new_vectors.len());
        let mut metadata = Vec::with_capacity(snapshot.len() + new_chunks.len());
        let mut removed_chunks = 0;
        for (row_id, chunk) in snapshot.metadata().iter().enumerate() {
            if to_evict.contains(chunk.path.as_str()) {
                removed_chunks += 1;
                continue;
            }
            vectors.push(snapshot.vector(row_id).to_vec());
            metadata.push(chunk.clone());
        }

        let added_chunks = new_chunks.len();
        if added_chunks == 0 && removed_chunks == 0 {
            debug!("Changes produced no rows to add or remove");
            return Ok(UpdateOutcome::Updated {
                added_chunks,
                removed_chunks,
                total_chunks: snapshot.len(),
            });
        }

        vectors.extend(new_vectors);
        metadata.extend(new_chunks);
        let total_chunks = metadata.len();

        progress.report(0.95, "Saving index");
        self.store.create(vectors, metadata)?;

        info!(
            "Index updated: {} chunks added, {} removed, {} total",
            added_chunks, removed_chunks, total_chunks
        );

        Ok(UpdateOutcome::Updated {
            added_chunks,
            removed_chunks,
            total_chunks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HashingEmbedder;
    use crate::error::BackendError;
    use crate::progress::NoProgress;
    use tempfile::tempdir;

    const DIM: usize = 32;

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn dimension(&self) -> usize {
            DIM
        }

        fn embed(&self, _texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, BackendError> {
            Err(BackendError::Embed("model crashed".to_string()))
        }
    }

    fn lines(prefix: &str, count: usize) -> String {
        (1..=count).map(|i| format!("{}_{}", prefix, i)).collect::<Vec<_>>().join("\n")
    }

    fn updater(dir: &std::path::Path, embedder: Arc<dyn Embedder>) -> IncrementalUpdater {
        IncrementalUpdater::new(Arc::new(VectorStore::new(dir, DIM)), embedder, Chunker::default(), 4)
    }

    /// Seed the store and fingerprints the way a full rebuild does
    fn seed(updater: &IncrementalUpdater, files: &[CodeFile]) {
        let chunks = updater.chunker().chunk_all(files);
        let vectors = embed_chunks(updater.embedder().as_ref(), &chunks, 4, &NoProgress).unwrap();
        updater.store().create(vectors, chunks).unwrap();
        FingerprintTable::from_files(files).save(updater.fingerprints_path()).unwrap();
    }

    #[test]
    fn test_changed_file_rows_are_replaced() {
        let dir = tempdir().unwrap();
        let updater = updater(dir.path(), Arc::new(HashingEmbedder::new(DIM)));
        let a = CodeFile::new("a.py", lines("alpha", 60));
        let b = CodeFile::new("b.py", lines("beta", 10));
        seed(&updater, &[a, b.clone()]);

        let b_vector = updater.store().snapshot().unwrap().vector(2).to_vec();

        let a = CodeFile::new("a.py", lines("gamma", 60));
        let outcome = updater.update(&[a, b], &NoProgress);
        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                added_chunks: 2,
                removed_chunks: 2,
                total_chunks: 3,
            }
        );

        let snapshot = updater.store().snapshot().unwrap();
        let rows: Vec<(&str, usize, usize)> = snapshot
            .metadata()
            .iter()
            .map(|c| (c.path.as_str(), c.start_line, c.end_line))
            .collect();
        assert_eq!(rows, vec![("b.py", 1, 10), ("a.py", 1, 50), ("a.py", 41, 60)]);
        assert_eq!(snapshot.vector(0), b_vector.as_slice());
        assert!(snapshot.metadata()[1].content.starts_with("gamma_1"));
    }

    #[test]
    fn test_second_update_is_noop() {
        let dir = tempdir().unwrap();
        let updater = updater(dir.path(), Arc::new(HashingEmbedder::new(DIM)));
        seed(&updater, &[CodeFile::new("a.py", lines("alpha", 5))]);

        let files = vec![CodeFile::new("a.py", lines("alpha", 5)), CodeFile::new("n.py", lines("new", 3))];
        assert!(matches!(updater.update(&files, &NoProgress), UpdateOutcome::Updated { added_chunks: 1, .. }));

        let generation = updater.store().snapshot().unwrap().generation();
        let table = std::fs::read_to_string(updater.fingerprints_path()).unwrap();

        assert_eq!(updater.update(&files, &NoProgress), UpdateOutcome::Unchanged);
        assert_eq!(updater.store().snapshot().unwrap().generation(), generation);
        assert_eq!(std::fs::read_to_string(updater.fingerprints_path()).unwrap(), table);
    }

    #[test]
    fn test_deletion_only() {
        let dir = tempdir().unwrap();
        let updater = updater(dir.path(), Arc::new(HashingEmbedder::new(DIM)));
        let keep = CodeFile::new("keep.py", lines("keep", 5));
        seed(&updater, &[keep.clone(), CodeFile::new("gone.py", lines("gone", 5))]);

        let outcome = updater.update(&[keep], &NoProgress);
        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                added_chunks: 0,
                removed_chunks: 1,
                total_chunks: 1,
            }
        );

        let snapshot = updater.store().snapshot().unwrap();
        assert_eq!(snapshot.metadata()[0].path, "keep.py");
        let table = FingerprintTable::load(updater.fingerprints_path());
        assert!(!table.contains("gone.py"));
    }

    #[test]
    fn test_missing_index_needs_rebuild() {
        let dir = tempdir().unwrap();
        let updater = updater(dir.path(), Arc::new(HashingEmbedder::new(DIM)));

        let outcome = updater.update(&[CodeFile::new("a.py", "print(1)")], &NoProgress);
        assert_eq!(outcome, UpdateOutcome::NeedsRebuild);
        assert!(!outcome.is_updated());
        assert!(!updater.fingerprints_path().exists());
    }

    #[test]
    fn test_embedder_failure_leaves_store_untouched() {
        let dir = tempdir().unwrap();
        let original = vec![CodeFile::new("a.py", lines("alpha", 5))];
        seed(&updater(dir.path(), Arc::new(HashingEmbedder::new(DIM))), &original);

        let failing = updater(dir.path(), Arc::new(FailingEmbedder));
        let outcome = failing.update(&[CodeFile::new("a.py", lines("changed", 5))], &NoProgress);

        assert!(matches!(outcome, UpdateOutcome::Failed(_)));
        let snapshot = failing.store().snapshot().unwrap();
        assert!(snapshot.metadata()[0].content.starts_with("alpha_1"));
        assert_eq!(FingerprintTable::load(failing.fingerprints_path()), FingerprintTable::from_files(&original));
    }
}
