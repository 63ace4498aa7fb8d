// CLI command implementations

pub mod ask;
pub mod generate;
pub mod index;
pub mod languages;
pub mod search;
pub mod stats;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use repoqa::backend::{CommandGenerator, Embedder, Generator, HashingEmbedder, LazyEmbedder};
use repoqa::config::Config;
use repoqa::index::store::VectorStore;
use repoqa::indexer::chunker::Chunker;
use repoqa::indexer::Indexer;
use repoqa::query::HybridSearch;

/// Run the configured generation command, if any, over `prompt`
pub fn run_generation(command: Option<&str>, prompt: &str) -> Result<Option<String>> {
    let Some(command) = command else {
        return Ok(None);
    };
    let generator = CommandGenerator::from_command_line(command)?;
    let output = generator
        .generate(prompt)
        .with_context(|| format!("Generation command '{}' failed", command))?;
    Ok(Some(output))
}

/// Print generated text, or the prompt when no command is configured
pub fn print_generation(output: Option<String>, prompt: &str) {
    match output {
        Some(output) => println!("{}", output),
        None => {
            println!("No generation command configured; set [generation] command in .repoqa.toml.");
            println!("Prompt:\n");
            println!("{}", prompt);
        }
    }
}

/// `--weight` if given, else the configured semantic weight
pub fn resolve_weight(weight: Option<f32>, configured: f32) -> Result<f32> {
    let weight = weight.unwrap_or(configured);
    if !weight.is_finite() {
        bail!("Semantic weight must be a number between 0 and 1, got {}", weight);
    }
    Ok(weight)
}

/// Configuration and index handles for one project directory
pub struct Project {
    pub root: PathBuf,
    pub config: Config,
    pub store: Arc<VectorStore>,
    pub embedder: Arc<dyn Embedder>,
}

impl Project {
    pub fn open(project: &str) -> Result<Self> {
        let root = PathBuf::from(project);
        if !root.is_dir() {
            bail!("Project directory not found: {}", root.display());
        }

        let config = Config::from_project_dir(&root);
        let dimension = config.embedding.dimension;
        let store = Arc::new(VectorStore::new(config.index_dir(&root), dimension));
        let embedder: Arc<dyn Embedder> =
            Arc::new(LazyEmbedder::new(dimension, move || Ok(HashingEmbedder::new(dimension))));

        Ok(Self {
            root,
            config,
            store,
            embedder,
        })
    }

    pub fn config_label(&self) -> &'static str {
        if self.config.project.name != "unnamed-project" {
            "loaded"
        } else {
            "default"
        }
    }

    pub fn indexer(&self) -> Result<Indexer> {
        let chunker = Chunker::new(self.config.indexing.chunk_size, self.config.indexing.chunk_overlap)?;
        Ok(Indexer::new(
            Arc::clone(&self.store),
            Arc::clone(&self.embedder),
            chunker,
            self.config.indexing.batch_size,
        ))
    }

    pub fn search(&self) -> HybridSearch {
        HybridSearch::new(Arc::clone(&self.store), Arc::clone(&self.embedder))
    }
}
