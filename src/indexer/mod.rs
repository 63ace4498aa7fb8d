// Chunking, change detection and (re)building of the vector index

pub mod changes;
pub mod chunker;
pub mod discovery;
pub mod incremental;
pub mod watcher;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::Embedder;
use crate::error::{BackendError, IndexError, Result};
use crate::index::store::VectorStore;
use crate::index::{Chunk, CodeFile};
use crate::progress::ProgressReporter;

use changes::FingerprintTable;
use chunker::Chunker;
pub use incremental::{IncrementalUpdater, UpdateOutcome};

/// Embed chunk texts in batches, reporting progress per batch
pub fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: &[Chunk],
    batch_size: usize,
    progress: &dyn ProgressReporter,
) -> std::result::Result<Vec<Vec<f32>>, BackendError> {
    let batch_size = batch_size.max(1);
    let mut vectors = Vec::with_capacity(chunks.len());

    for (i, batch) in chunks.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.content.clone()).collect();
        let embedded = embedder.embed(&texts)?;
        if embedded.len() != texts.len() {
            return Err(BackendError::Embed(format!(
                "expected {} vectors, embedder returned {}",
                texts.len(),
                embedded.len()
            )));
        }
        vectors.extend(embedded);

        let done = ((i + 1) * batch_size).min(chunks.len());
        debug!("Embedded {}/{} chunks", done, chunks.len());
        progress.report(
            0.1 + 0.8 * done as f32 / chunks.len() as f32,
            &format!("Embedded {}/{} chunks", done, chunks.len()),
        );
    }

    Ok(vectors)
}

/// What `Indexer::sync` ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Incremental(UpdateOutcome),
    Rebuilt { total_chunks: usize },
}

/// Keeps a vector store in line with a repository snapshot
pub struct Indexer {
    updater: IncrementalUpdater,
}

impl Indexer {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>, chunker: Chunker, batch_size: usize) -> Self {
        Self {
            updater: IncrementalUpdater::new(store, embedder, chunker, batch_size),
        }
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        self.updater.store()
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        self.updater.embedder()
    }

    /// Chunk, embed and store every file, replacing any existing index
    pub fn rebuild(&self, files: &[CodeFile], progress: &dyn ProgressReporter) -> Result<usize> {
        info!("Rebuilding index from {} files", files.len());
        progress.report(0.0, "Chunking files");

        let chunks = self.updater.chunker().chunk_all(files);
        info!("Created {} chunks", chunks.len());

        let vectors = embed_chunks(
            self.updater.embedder().as_ref(),
            &chunks,
            self.updater.batch_size(),
            progress,
        )?;

        progress.report(0.95, "Saving index");
        let total_chunks = chunks.len();
        self.store().create(vectors, chunks)?;
        FingerprintTable::from_files(files).save(self.updater.fingerprints_path())?;

        progress.report(1.0, "Index rebuilt");
        info!("Index rebuilt with {} chunks", total_chunks);
        Ok(total_chunks)
    }

    pub fn update(&self, files: &[CodeFile], progress: &dyn ProgressReporter) -> UpdateOutcome {
        self.updater.update(files, progress)
    }

    /// Incremental update, falling back to a full rebuild when it cannot apply
    pub fn sync(&self, files: &[CodeFile], progress: &dyn ProgressReporter) -> Result<SyncOutcome> {
        match self.update(files, progress) {
            UpdateOutcome::Unchanged => match self.store().snapshot() {
                Ok(_) => Ok(SyncOutcome::Incremental(UpdateOutcome::Unchanged)),
                // Fingerprints match but the persisted index did not load
                Err(IndexError::IndexUnavailable | IndexError::DimensionMismatch { .. }) => {
                    warn!("Files unchanged but no usable index on disk; rebuilding");
                    let total_chunks = self.rebuild(files, progress)?;
                    Ok(SyncOutcome::Rebuilt { total_chunks })
                }
                Err(e) => Err(e),
            },
            outcome @ UpdateOutcome::Updated { .. } => Ok(SyncOutcome::Incremental(outcome)),
            UpdateOutcome::NeedsRebuild => {
                let total_chunks = self.rebuild(files, progress)?;
                Ok(SyncOutcome::Rebuilt { total_chunks })
            }
            UpdateOutcome::Failed(reason) => {
                warn!("Falling back to full rebuild: {}", reason);
                let total_chunks = self.rebuild(files, progress)?;
                Ok(SyncOutcome::Rebuilt { total_chunks })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HashingEmbedder;
    use crate::index::store::VECTORS_FILE;
    use crate::progress::NoProgress;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const DIM: usize = 16;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<f32>>);

    impl ProgressReporter for Recorder {
        fn report(&self, fraction: f32, _message: &str) {
            self.0.lock().unwrap().push(fraction);
        }
    }

    fn indexer(dir: &std::path::Path) -> Indexer {
        Indexer::new(
            Arc::new(VectorStore::new(dir, DIM)),
            Arc::new(HashingEmbedder::new(DIM)),
            Chunker::default(),
            2,
        )
    }

    fn files() -> Vec<CodeFile> {
        vec![
            CodeFile::new("src/app.py", "def main():\n    run_server()\n"),
            CodeFile::new("src/util.rs", "fn helper() -> u32 { 42 }\n"),
            CodeFile::new("README.md", "# Project\n"),
        ]
    }

    #[test]
    fn test_embed_chunks_batches_and_progress() {
        let chunker = Chunker::default();
        let chunks = chunker.chunk_all(&files());
        let recorder = Recorder::default();

        let vectors = embed_chunks(&HashingEmbedder::new(DIM), &chunks, 2, &recorder).unwrap();
        assert_eq!(vectors.len(), 3);

        let reported = recorder.0.lock().unwrap().clone();
        assert_eq!(reported.len(), 2);
        assert!(reported.windows(2).all(|w| w[0] <= w[1]));
        assert!((reported[1] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_rebuild_persists_index_and_fingerprints() {
        let dir = tempdir().unwrap();
        let indexer = indexer(dir.path());

        assert_eq!(indexer.rebuild(&files(), &NoProgress).unwrap(), 3);

        let reopened = VectorStore::new(dir.path(), DIM);
        assert!(reopened.load());
        assert_eq!(reopened.snapshot().unwrap().len(), 3);
        assert_eq!(
            FingerprintTable::load(dir.path().join(changes::FINGERPRINTS_FILE)),
            FingerprintTable::from_files(&files())
        );
    }

    #[test]
    fn test_sync_rebuilds_then_updates() {
        let dir = tempdir().unwrap();
        let indexer = indexer(dir.path());

        assert_eq!(
            indexer.sync(&files(), &NoProgress).unwrap(),
            SyncOutcome::Rebuilt { total_chunks: 3 }
        );
        assert_eq!(
            indexer.sync(&files(), &NoProgress).unwrap(),
            SyncOutcome::Incremental(UpdateOutcome::Unchanged)
        );

        let mut edited = files();
        edited[0] = CodeFile::new("src/app.py", "def main():\n    serve_forever()\n");
        assert!(matches!(
            indexer.sync(&edited, &NoProgress).unwrap(),
            SyncOutcome::Incremental(UpdateOutcome::Updated { added_chunks: 1, removed_chunks: 1, total_chunks: 3 })
        ));
    }

    #[test]
    fn test_sync_rebuilds_unloadable_index() {
        let dir = tempdir().unwrap();
        indexer(dir.path()).rebuild(&files(), &NoProgress).unwrap();

        // Flip the last byte so the digest no longer matches
        let vectors_path = dir.path().join(VECTORS_FILE);
        let mut bytes = std::fs::read(&vectors_path).unwrap();
        *bytes.last_mut().unwrap() ^= 0xff;
        std::fs::write(&vectors_path, &bytes).unwrap();

        let reopened = indexer(dir.path());
        assert!(matches!(reopened.store().snapshot(), Err(IndexError::IndexUnavailable)));
        assert_eq!(
            reopened.sync(&files(), &NoProgress).unwrap(),
            SyncOutcome::Rebuilt { total_chunks: 3 }
        );
        assert_eq!(reopened.store().search(&[0.0; DIM], 1).unwrap().len(), 1);
        assert_eq!(
            reopened.sync(&files(), &NoProgress).unwrap(),
            SyncOutcome::Incremental(UpdateOutcome::Unchanged)
        );
    }

    #[test]
    fn test_sync_rebuilds_missing_index() {
        let dir = tempdir().unwrap();
        indexer(dir.path()).rebuild(&files(), &NoProgress).unwrap();
        std::fs::remove_file(dir.path().join(VECTORS_FILE)).unwrap();

        assert_eq!(
            indexer(dir.path()).sync(&files(), &NoProgress).unwrap(),
            SyncOutcome::Rebuilt { total_chunks: 3 }
        );
    }
}
