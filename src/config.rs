// Configuration management for repoqa

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::indexer::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

/// File name looked up in the project root
pub const CONFIG_FILE: &str = ".repoqa.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub indexing: IndexingConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    /// File extensions (with leading dot) to index; empty means all
    pub extensions: Vec<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
    /// Index directory, relative to the project root
    pub index_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
    pub semantic_weight: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Command that reads a prompt on stdin and answers on stdout
    pub command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "unnamed-project".to_string(),
            root: ".".to_string(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            exclude: vec![
                "target/".to_string(),
                "node_modules/".to_string(),
                ".git/".to_string(),
                "__pycache__/".to_string(),
                ".repoqa/".to_string(),
                "*.min.js".to_string(),
            ],
            include: vec![],
            extensions: vec![
                ".py", ".js", ".jsx", ".ts", ".tsx", ".java", ".c", ".cpp", ".h", ".hpp", ".cs",
                ".go", ".rb", ".php", ".swift", ".kt", ".rs", ".md", ".txt",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            batch_size: 8,
            index_dir: ".repoqa".to_string(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimension: 384 }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            semantic_weight: 0.7,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.repoqa.toml` from the project root, falling back to defaults
    pub fn from_project_dir<P: AsRef<Path>>(project_dir: P) -> Self {
        let config_path = project_dir.as_ref().join(CONFIG_FILE);

        match Self::from_file(&config_path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {}", config_path.display());
                config
            }
            Err(e) => {
                tracing::debug!("Could not load config from {}: {}", config_path.display(), e);
                tracing::info!("Using default configuration");
                Self::default()
            }
        }
    }

    /// Index directory of the project rooted at `project_dir`
    pub fn index_dir(&self, project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join(&self.indexing.index_dir)
    }

    /// Check if a repository-relative path should be indexed
    pub fn should_index_file(&self, file_path: &str) -> bool {
        // Excludes win over includes
        for pattern in &self.indexing.exclude {
            if self.matches_pattern(file_path, pattern) {
                return false;
            }
        }

        if !self.has_indexed_extension(file_path) {
            return false;
        }

        // If include patterns are specified, file must match at least one
        if !self.indexing.include.is_empty() {
            return self
                .indexing
                .include
                .iter()
                .any(|pattern| self.matches_pattern(file_path, pattern));
        }

        true
    }

    fn has_indexed_extension(&self, file_path: &str) -> bool {
        if self.indexing.extensions.is_empty() {
            return true;
        }

        let extension = match Path::new(file_path).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!(".{}", ext.to_lowercase()),
            None => return false,
        };
        self.indexing
            .extensions
            .iter()
            .any(|allowed| allowed.to_lowercase() == extension)
    }

    /// Simple glob-style matching: `dir/`, `*.ext`, `**/dir/**`, substring
    fn matches_pattern(&self, file_path: &str, pattern: &str) -> bool {
        if let Some(dir) = pattern.strip_suffix('/') {
            file_path.starts_with(pattern) || file_path.contains(&format!("/{}/", dir))
        } else if let Some(suffix) = pattern.strip_prefix("*.") {
            file_path.ends_with(&format!(".{}", suffix))
        } else if pattern.len() > 6 && pattern.starts_with("**/") && pattern.ends_with("/**") {
            let dir = &pattern[3..pattern.len() - 3];
            file_path.starts_with(&format!("{}/", dir)) || file_path.contains(&format!("/{}/", dir))
        } else {
            file_path.contains(pattern)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.project.name.is_empty() {
            bail!("Project name cannot be empty");
        }

        if self.indexing.chunk_size == 0 {
            bail!("Chunk size must be greater than 0");
        }
        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            bail!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.indexing.chunk_overlap,
                self.indexing.chunk_size
            );
        }
        if self.indexing.batch_size == 0 {
            bail!("Batch size must be greater than 0");
        }
        if self.indexing.index_dir.is_empty() {
            bail!("Index directory cannot be empty");
        }

        if self.embedding.dimension == 0 {
            bail!("Embedding dimension must be greater than 0");
        }

        if self.search.top_k == 0 {
            bail!("top_k must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.search.semantic_weight) {
            bail!(
                "Semantic weight must be between 0 and 1, got {}",
                self.search.semantic_weight
            );
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!("Invalid log level: {}", self.logging.level);
        }
        let valid_formats = ["compact", "pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }
}
