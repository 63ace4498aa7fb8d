// Line-window chunking of source files

use crate::index::{Chunk, ChunkMetadata, CodeFile};

pub const DEFAULT_CHUNK_SIZE: usize = 50;
pub const DEFAULT_CHUNK_OVERLAP: usize = 10;

/// Language name reported for extensions missing from the table
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// Extension -> language table
pub const LANGUAGES: &[(&str, &str)] = &[
    (".py", "Python"),
    (".js", "JavaScript"),
    (".jsx", "JavaScript/React"),
    (".ts", "TypeScript"),
    (".tsx", "TypeScript/React"),
    (".java", "Java"),
    (".c", "C"),
    (".cpp", "C++"),
    (".h", "C/C++ Header"),
    (".hpp", "C++ Header"),
    (".cs", "C#"),
    (".go", "Go"),
    (".rb", "Ruby"),
    (".php", "PHP"),
    (".swift", "Swift"),
    (".kt", "Kotlin"),
    (".rs", "Rust"),
];

/// Map an extension (with or without the leading dot) to a language name
pub fn language_for_extension(extension: &str) -> &'static str {
    let extension = extension.trim_start_matches('.');
    LANGUAGES
        .iter()
        .find(|(ext, _)| ext.trim_start_matches('.').eq_ignore_ascii_case(extension))
        .map(|(_, language)| *language)
        .unwrap_or(UNKNOWN_LANGUAGE)
}

/// Splits files into overlapping windows of whole lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker {
    /// Requires `overlap < chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> anyhow::Result<Self> {
        if chunk_size == 0 {
            anyhow::bail!("Chunk size must be greater than 0");
        }
        if overlap >= chunk_size {
            anyhow::bail!("Chunk overlap ({}) must be smaller than chunk size ({})", overlap, chunk_size);
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Chunks of one file in ascending start_line order
    ///
    /// Windows that hold only whitespace are skipped.
    pub fn chunk(&self, file: &CodeFile) -> Vec<Chunk> {
        let lines: Vec<&str> = file.content.lines().collect();
        let language = language_for_extension(&file.extension);

        (0..lines.len())
            .step_by(self.stride())
            .filter_map(|start| {
                let end = (start + self.chunk_size).min(lines.len());
                let content = lines[start..end].join("\n");
                if content.trim().is_empty() {
                    return None;
                }

                Some(Chunk {
                    path: file.path.clone(),
                    content,
                    start_line: start + 1,
                    end_line: end,
                    metadata: ChunkMetadata {
                        file: file.path.clone(),
                        language: language.to_string(),
                    },
                })
            })
            .collect()
    }

    pub fn chunk_all<'a>(&self, files: impl IntoIterator<Item = &'a CodeFile>) -> Vec<Chunk> {
        files.into_iter().flat_map(|file| self.chunk(file)).collect()
    }
}
