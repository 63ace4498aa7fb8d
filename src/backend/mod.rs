// Embedding and generation collaborators

pub mod command;
pub mod hashing;

use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

use crate::error::BackendError;

pub use command::CommandGenerator;
pub use hashing::HashingEmbedder;

/// Turns texts into fixed-dimension vectors
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;

    /// One vector per input text, in input order
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError>;

    fn embed_query(&self, query: &str) -> Result<Vec<f32>, BackendError> {
        self.embed(&[query.to_string()])?
            .pop()
            .ok_or_else(|| BackendError::Embed("embedder returned no vector for the query".to_string()))
    }
}

/// Turns a prompt into generated text
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

type Loader<E> = Box<dyn Fn() -> Result<E, BackendError> + Send + Sync>;

/// Embedder whose model is loaded on first use
///
/// The first caller runs the loader; callers arriving while it runs block
/// on the same cell and share the loaded model. A failed load leaves the
/// cell empty so the next caller retries.
pub struct LazyEmbedder<E: Embedder> {
    dimension: usize,
    loader: Loader<E>,
    model: OnceCell<Arc<E>>,
}

impl<E: Embedder> LazyEmbedder<E> {
    pub fn new<F>(dimension: usize, loader: F) -> Self
    where
        F: Fn() -> Result<E, BackendError> + Send + Sync + 'static,
    {
        Self {
            dimension,
            loader: Box::new(loader),
            model: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// The shared model, loading it if nobody has yet
    pub fn model(&self) -> Result<Arc<E>, BackendError> {
        self.model
            .get_or_try_init(|| {
                info!("Loading embedding model");
                let model = (self.loader)()?;
                if model.dimension() != self.dimension {
                    return Err(BackendError::Load(format!(
                        "model produces {}-dimensional vectors, expected {}",
                        model.dimension(),
                        self.dimension
                    )));
                }
                info!("Embedding model loaded");
                Ok(Arc::new(model))
            })
            .cloned()
    }
}

impl<E: Embedder> Embedder for LazyEmbedder<E> {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        self.model()?.embed(texts)
    }
}
