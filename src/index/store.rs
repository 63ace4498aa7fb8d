// Exact nearest-neighbour vector store with parallel chunk metadata
//
// The store has no row-level delete or append. Callers that need either
// reconstruct all vectors, filter/extend them, and call `create` again.

use parking_lot::RwLock;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::db::{IndexInfo, MetadataDatabase};
use super::{vectors, Chunk, SearchResult};
use crate::error::{IndexError, Result};

pub const VECTORS_FILE: &str = "vectors.bin";
pub const METADATA_FILE: &str = "metadata.db";

/// An immutable, fully loaded index: row i of `data` belongs to `metadata[i]`
#[derive(Debug)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
    metadata: Vec<Chunk>,
    generation: u64,
}

impl FlatIndex {
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metadata(&self) -> &[Chunk] {
        &self.metadata
    }

    /// Changes every time the store is created or reloaded
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn vector(&self, row_id: usize) -> &[f32] {
        let start = row_id * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Every stored vector in row-id order
    pub fn reconstruct_all(&self) -> Vec<Vec<f32>> {
        (0..self.len()).map(|row| self.vector(row).to_vec()).collect()
    }

    /// The `k` nearest rows as (row_id, squared L2 distance), nearest first
    fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .map(|row| (row, squared_l2(query, self.vector(row))))
            .collect();

        let by_distance = |a: &(usize, f32), b: &(usize, f32)| -> Ordering {
            a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
        };

        if k < scored.len() {
            scored.select_nth_unstable_by(k, by_distance);
            scored.truncate(k);
        }
        scored.sort_by(by_distance);
        scored
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Persistent flat vector store rooted at an index directory
pub struct VectorStore {
    index_dir: PathBuf,
    dimension: usize,
    state: RwLock<Option<Arc<FlatIndex>>>,
    generation: AtomicU64,
}

impl VectorStore {
    pub fn new(index_dir: impl AsRef<Path>, dimension: usize) -> Self {
        Self {
            index_dir: index_dir.as_ref().to_path_buf(),
            dimension,
            state: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.index_dir.join(VECTORS_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.index_dir.join(METADATA_FILE)
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().is_some()
    }

    /// Replace the whole index with `vectors`/`metadata` and persist it
    ///
    /// Nothing in memory changes unless the new index was written out.
    pub fn create(&self, vectors: Vec<Vec<f32>>, metadata: Vec<Chunk>) -> Result<()> {
        if vectors.len() != metadata.len() {
            return Err(IndexError::LengthMismatch {
                vectors: vectors.len(),
                metadata: metadata.len(),
            });
        }

        let mut data = Vec::with_capacity(vectors.len() * self.dimension);
        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        self.persist(&data, &metadata)?;

        let index = FlatIndex {
            dimension: self.dimension,
            data,
            metadata,
            generation: self.next_generation(),
        };
        info!("Created vector index with {} rows", index.len());
        *self.state.write() = Some(Arc::new(index));

        Ok(())
    }

    /// Restore the last persisted index; prior state is kept on failure
    pub fn load(&self) -> bool {
        match self.try_load() {
            Ok(Some(index)) => {
                info!("Loaded vector index with {} rows", index.len());
                *self.state.write() = Some(Arc::new(index));
                true
            }
            Ok(None) => {
                debug!("No persisted index in {}", self.index_dir.display());
                false
            }
            Err(e) => {
                warn!("Failed to load index from {}: {}", self.index_dir.display(), e);
                false
            }
        }
    }

    /// The current index, loading it from disk if nothing is in memory
    pub fn snapshot(&self) -> Result<Arc<FlatIndex>> {
        if let Some(index) = self.state.read().as_ref() {
            return Ok(Arc::clone(index));
        }

        if self.load() {
            if let Some(index) = self.state.read().as_ref() {
                return Ok(Arc::clone(index));
            }
        }

        Err(IndexError::IndexUnavailable)
    }

    /// Up to `k` results, nearest first, scored `1 / (1 + distance)`
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let index = self.snapshot()?;

        if query.len() != index.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: index.dimension(),
                actual: query.len(),
            });
        }

        let results = index
            .nearest(query, k)
            .into_iter()
            .map(|(row, distance)| {
                SearchResult::from_chunk(row, &index.metadata()[row], 1.0 / (1.0 + distance))
            })
            .collect();

        Ok(results)
    }

    pub fn reconstruct_all(&self) -> Result<Vec<Vec<f32>>> {
        Ok(self.snapshot()?.reconstruct_all())
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    fn persist(&self, data: &[f32], metadata: &[Chunk]) -> Result<()> {
        std::fs::create_dir_all(&self.index_dir)?;

        let bytes = vectors::encode(self.dimension, data);
        let info = IndexInfo {
            dimension: self.dimension,
            count: metadata.len(),
            vectors_digest: vectors::digest(&bytes),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        // The digest ties the two files together; a crash between the
        // commit and the rename leaves them disagreeing and `load` refuses.
        let final_path = self.vectors_path();
        let tmp_path = self.index_dir.join(format!("{}.tmp", VECTORS_FILE));
        std::fs::write(&tmp_path, &bytes)?;

        let db = MetadataDatabase::open(self.metadata_path())?;
        db.replace_all(metadata, &info)?;

        std::fs::rename(&tmp_path, &final_path)?;

        debug!("Persisted {} vectors to {}", metadata.len(), final_path.display());
        Ok(())
    }

    fn try_load(&self) -> Result<Option<FlatIndex>> {
        let vectors_path = self.vectors_path();
        let metadata_path = self.metadata_path();

        if !vectors_path.exists() || !metadata_path.exists() {
            return Ok(None);
        }

        let db = MetadataDatabase::open(&metadata_path)?;
        let info = match db.index_info()? {
            Some(info) => info,
            None => return Ok(None),
        };

        let bytes = std::fs::read(&vectors_path)?;
        if vectors::digest(&bytes) != info.vectors_digest {
            return Err(IndexError::Corrupt(
                "vectors.bin does not match the stored metadata".to_string(),
            ));
        }

        let (dimension, data) = vectors::decode(&bytes)?;
        if dimension != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: dimension,
            });
        }

        let metadata = db.load_chunks()?;
        if metadata.len() != info.count || data.len() != info.count * dimension {
            return Err(IndexError::Corrupt(format!(
                "index info promises {} rows, found {} metadata rows",
                info.count,
                metadata.len()
            )));
        }

        Ok(Some(FlatIndex {
            dimension,
            data,
            metadata,
            generation: self.next_generation(),
        }))
    }
}
