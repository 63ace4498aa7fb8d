// Index storage: chunk records, vector file and the flat vector store

pub mod db;
pub mod schema;
pub mod store;
pub mod vectors;

use serde::{Deserialize, Serialize};

/// A source file handed over by file discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFile {
    /// Repository-relative path, unique per snapshot
    pub path: String,
    pub content: String,
    /// Extension including the leading dot (".py"), empty when absent
    pub extension: String,
}

impl CodeFile {
    /// Build a file record, deriving the extension from the path
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let extension = std::path::Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        Self {
            path,
            content: content.into(),
            extension,
        }
    }
}

/// Per-chunk metadata carried alongside the text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file: String,
    pub language: String,
}

/// A line-range slice of one file; the unit of retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub path: String,
    pub content: String,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    pub metadata: ChunkMetadata,
}

/// One ranked hit, produced per query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Row id of the chunk in the vector store
    pub row_id: usize,
    pub path: String,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub metadata: ChunkMetadata,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_score: Option<f32>,
}

impl SearchResult {
    pub fn from_chunk(row_id: usize, chunk: &Chunk, score: f32) -> Self {
        Self {
            row_id,
            path: chunk.path.clone(),
            content: chunk.content.clone(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            metadata: chunk.metadata.clone(),
            score,
            semantic_score: None,
            keyword_score: None,
            combined_score: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_file_extension() {
        assert_eq!(CodeFile::new("src/app.py", "").extension, ".py");
        assert_eq!(CodeFile::new("lib/mod.test.ts", "").extension, ".ts");
        assert_eq!(CodeFile::new("Makefile", "").extension, "");
    }
}
