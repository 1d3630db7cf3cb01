//! Embedding generation and semantic search.
//!
//! The `SearchService` owns the embedding backend, produces the embedding
//! rows that commit together with pad mutations, and runs filtered
//! nearest-neighbor queries through the catalog's vector scan.

mod backend;
mod documents;
mod service;

pub use backend::{select_backend, EmbeddingBackend, HashingEmbedder};
pub use documents::{build_documents, build_snippet, EmbeddingDocument};
pub use service::SearchService;
