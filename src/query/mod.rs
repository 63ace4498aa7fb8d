// Retrieval over the vector store: keyword index, hybrid ranking, prompts

pub mod hybrid;
pub mod keyword;
pub mod prompt;

pub use hybrid::HybridSearch;
pub use keyword::KeywordIndex;
pub use prompt::{build_prompt, FileTask};
