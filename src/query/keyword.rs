// Keyword index: inverted index plus per-chunk TF-IDF weights

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;

use crate::index::Chunk;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]").unwrap());

/// Control-flow and keyword tokens shared by most languages
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "if", "else", "for", "while", "return", "def", "class", "import", "from", "self", "this",
        "function", "var", "let", "const", "int", "float", "string", "bool", "true", "false",
        "none", "null", "and", "or", "not", "in", "is", "as", "with", "try", "except", "finally",
    ]
    .into_iter()
    .collect()
});

/// Lowercase, split on anything outside `[a-z0-9_]`, drop short and stop-word tokens
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_WORD
        .replace_all(&lowered, " ")
        .split_whitespace()
        .filter(|token| token.len() >= 2 && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Inverted index and TF-IDF table over a metadata sequence
///
/// Document frequencies are global, so any change to the chunk sequence
/// means building a new index.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    postings: HashMap<String, BTreeSet<usize>>,
    tfidf: Vec<HashMap<String, f32>>,
}

impl KeywordIndex {
    pub fn build(chunks: &[Chunk]) -> Self {
        let tokenized: Vec<Vec<String>> = chunks.iter().map(|chunk| tokenize(&chunk.content)).collect();

        let mut postings: HashMap<String, BTreeSet<usize>> = HashMap::new();
        for (row_id, tokens) in tokenized.iter().enumerate() {
            for token in tokens {
                postings.entry(token.clone()).or_default().insert(row_id);
            }
        }

        let total_docs = chunks.len() as f32;
        let tfidf = tokenized
            .iter()
            .map(|tokens| {
                let mut counts: HashMap<&str, usize> = HashMap::new();
                for token in tokens {
                    *counts.entry(token.as_str()).or_insert(0) += 1;
                }

                // tf uses the filtered token count as document length
                let length = tokens.len() as f32;
                counts
                    .into_iter()
                    .filter_map(|(token, count)| {
                        let doc_freq = postings.get(token).map_or(0, BTreeSet::len);
                        if doc_freq == 0 {
                            return None;
                        }
                        let tf = count as f32 / length;
                        let idf = (total_docs / doc_freq as f32).ln();
                        Some((token.to_string(), tf * idf))
                    })
                    .collect()
            })
            .collect();

        info!("Keyword index built with {} unique tokens over {} chunks", postings.len(), chunks.len());

        Self { postings, tfidf }
    }

    pub fn doc_count(&self) -> usize {
        self.tfidf.len()
    }

    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    /// Row ids whose chunk contains `token`
    pub fn rows_with(&self, token: &str) -> Option<&BTreeSet<usize>> {
        self.postings.get(token)
    }

    pub fn weight(&self, row_id: usize, token: &str) -> Option<f32> {
        self.tfidf.get(row_id).and_then(|weights| weights.get(token)).copied()
    }

    /// Raw scores (summed TF-IDF of query tokens), best first, at most `limit`
    ///
    /// Ties keep ascending row id order.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(usize, f32)> {
        let mut scores: HashMap<usize, f32> = HashMap::new();

        for token in tokenize(query) {
            if let Some(rows) = self.postings.get(&token) {
                for &row_id in rows {
                    *scores.entry(row_id).or_insert(0.0) += self.weight(row_id, &token).unwrap_or(0.0);
                }
            }
        }

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ChunkMetadata;

    fn chunk(path: &str, content: &str) -> Chunk {
        Chunk {
            path: path.to_string(),
            content: content.to_string(),
            start_line: 1,
            end_line: content.lines().count().max(1),
            metadata: ChunkMetadata {
                file: path.to_string(),
                language: "Python".to_string(),
            },
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("def parse_Config(self, path): return x + Path2"),
            vec!["parse_config", "path", "path2"]
        );
        assert_eq!(tokenize("if else for while"), Vec::<String>::new());
        assert_eq!(tokenize("a-b.c"), Vec::<String>::new());
        assert_eq!(tokenize("fn überMain()"), vec!["fn", "bermain"]);
    }

    #[test]
    fn test_inverted_index() {
        let index = KeywordIndex::build(&[
            chunk("a.py", "alpha beta"),
            chunk("b.py", "beta gamma gamma"),
        ]);

        assert_eq!(index.doc_count(), 2);
        assert_eq!(index.rows_with("beta").unwrap().iter().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(index.rows_with("gamma").unwrap().len(), 1);
        assert!(index.rows_with("delta").is_none());
    }

    #[test]
    fn test_tfidf_weights() {
        let index = KeywordIndex::build(&[
            chunk("a.py", "alpha beta"),
            chunk("b.py", "beta gamma gamma"),
        ]);

        // gamma: tf = 2/3, idf = ln(2/1)
        let expected = 2.0 / 3.0 * 2f32.ln();
        assert!((index.weight(1, "gamma").unwrap() - expected).abs() < 1e-6);

        // beta appears everywhere: idf = ln(1) = 0
        assert_eq!(index.weight(0, "beta").unwrap(), 0.0);
        assert!(index.weight(0, "gamma").is_none());
    }

    #[test]
    fn test_search_ranks_unique_tokens_first() {
        let index = KeywordIndex::build(&[
            chunk("a.py", "shared words only"),
            chunk("b.py", "shared tokenizer_state words"),
            chunk("c.py", "shared words here"),
        ]);

        let results = index.search("tokenizer_state", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 1);

        let results = index.search("shared words", 2);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, score)| *score == 0.0));
        assert_eq!(results[0].0, 0);
    }

    #[test]
    fn test_empty_corpus() {
        let index = KeywordIndex::build(&[]);
        assert_eq!(index.doc_count(), 0);
        assert!(index.search("anything", 5).is_empty());
    }
}
