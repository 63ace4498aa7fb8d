//! Retrieval core for asking questions about a source repository.
//!
//! Files are split into overlapping line windows, embedded into an exact
//! vector store and searched by blending vector similarity with TF-IDF
//! keyword relevance. Content fingerprints keep re-indexing incremental.

pub mod backend;
pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod progress;
pub mod query;

pub use error::{BackendError, IndexError, Result};
