// Hybrid retrieval: vector similarity blended with TF-IDF keyword relevance

use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::keyword::KeywordIndex;
use crate::backend::Embedder;
use crate::error::Result;
use crate::index::store::{FlatIndex, VectorStore};
use crate::index::SearchResult;

pub struct HybridSearch {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    /// Keyword index paired with the store generation it was built from
    keyword: RwLock<Option<(u64, Arc<KeywordIndex>)>>,
}

impl HybridSearch {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            keyword: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// Top `k` results by `semantic * w + keyword * (1 - w)`, merged per path
    ///
    /// Results sharing a path collapse into one entry whose scores add up,
    /// so two matching chunks of one file surface as a single hit carrying
    /// the first chunk's text.
    pub fn search(&self, query: &str, k: usize, semantic_weight: f32) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let weight = semantic_weight.clamp(0.0, 1.0);
        let candidates = k * 2;

        let snapshot = self.store.snapshot()?;
        let keyword_index = self.keyword_index(&snapshot);

        let semantic = self.semantic_candidates(query, candidates)?;
        let keyword = keyword_candidates(&snapshot, &keyword_index, query, candidates);
        debug!(
            "Hybrid search: {} semantic and {} keyword candidates",
            semantic.len(),
            keyword.len()
        );

        let mut merged = merge_by_path(semantic, keyword, weight);
        merged.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(Ordering::Equal)
        });
        merged.truncate(k);
        for result in &mut merged {
            result.score = result.combined_score.unwrap_or(0.0);
        }

        Ok(merged)
    }

    /// Vector-only search; scores are the store's `1 / (1 + distance)`
    pub fn semantic_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed_query(query)?;
        self.store.search(&embedding, k)
    }

    /// Semantic candidates with `semantic_score` normalised by the batch maximum
    fn semantic_candidates(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let embedding = self.embedder.embed_query(query)?;
        let mut results = self.store.search(&embedding, limit)?;

        let divisor = batch_divisor(results.iter().map(|r| r.score));
        for result in &mut results {
            result.semantic_score = Some(result.score / divisor);
        }
        Ok(results)
    }

    /// The keyword index for `snapshot`, rebuilt when the store has moved on
    fn keyword_index(&self, snapshot: &FlatIndex) -> Arc<KeywordIndex> {
        if let Some((generation, index)) = self.keyword.read().as_ref() {
            if *generation == snapshot.generation() {
                return Arc::clone(index);
            }
        }

        info!("Building keyword index for generation {}", snapshot.generation());
        let index = Arc::new(KeywordIndex::build(snapshot.metadata()));
        *self.keyword.write() = Some((snapshot.generation(), Arc::clone(&index)));
        index
    }
}

fn keyword_candidates(
    snapshot: &FlatIndex,
    index: &KeywordIndex,
    query: &str,
    limit: usize,
) -> Vec<SearchResult> {
    let hits = index.search(query, limit);
    let divisor = batch_divisor(hits.iter().map(|(_, score)| *score));

    hits.into_iter()
        .filter_map(|(row_id, score)| {
            let chunk = snapshot.metadata().get(row_id)?;
            let mut result = SearchResult::from_chunk(row_id, chunk, score);
            result.keyword_score = Some(score / divisor);
            Some(result)
        })
        .collect()
}

/// Maximum of the batch, or 1.0 when the batch is empty or never positive
fn batch_divisor(scores: impl Iterator<Item = f32>) -> f32 {
    let max = scores.fold(f32::NEG_INFINITY, f32::max);
    if max > 0.0 {
        max
    } else {
        1.0
    }
}

/// Merge both candidate lists keyed by path, keeping first-seen order
fn merge_by_path(
    semantic: Vec<SearchResult>,
    keyword: Vec<SearchResult>,
    weight: f32,
) -> Vec<SearchResult> {
    let mut merged: Vec<SearchResult> = Vec::new();
    let mut by_path: HashMap<String, usize> = HashMap::new();

    for result in semantic {
        let score = result.semantic_score.unwrap_or(0.0);
        match by_path.get(&result.path) {
            Some(&slot) => {
                let entry = &mut merged[slot];
                entry.semantic_score = Some(score);
                entry.combined_score = Some(entry.combined_score.unwrap_or(0.0) + score * weight);
            }
            None => {
                by_path.insert(result.path.clone(), merged.len());
                let mut entry = result;
                entry.combined_score = Some(score * weight);
                merged.push(entry);
            }
        }
    }

    for result in keyword {
        let score = result.keyword_score.unwrap_or(0.0);
        match by_path.get(&result.path) {
            Some(&slot) => {
                let entry = &mut merged[slot];
                entry.keyword_score = Some(score);
                entry.combined_score =
                    Some(entry.combined_score.unwrap_or(0.0) + score * (1.0 - weight));
            }
            None => {
                by_path.insert(result.path.clone(), merged.len());
                let mut entry = result;
                entry.combined_score = Some(score * (1.0 - weight));
                merged.push(entry);
            }
        }
    }

    merged
}
