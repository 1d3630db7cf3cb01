//! Embedding backends.
//!
//! The default backend is a deterministic SHA-256 hashing embedder: fast,
//! dependency-free, and stable across processes, which makes search results
//! reproducible in tests and development. Real models are provided by the
//! `fastembed-backend` feature.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use scratch_notebook_core::{ScratchError, ScratchResult};

/// A text embedding backend. `embed` is CPU-bound and synchronous; callers
/// schedule it on the blocking pool.
pub trait EmbeddingBackend: Send + Sync {
    /// Model identifier, recorded as `embedding_version` on every row.
    fn name(&self) -> &str;
    fn dimension(&self) -> usize;
    fn embed(&self, texts: &[String], batch_size: usize) -> ScratchResult<Vec<Vec<f32>>>;
}

/// Deterministic hashing embedder (`debug-hash`), 64 dimensions.
///
/// Each byte of the SHA-256 digest maps to `[-1, 1]`; equal texts embed
/// identically, which is all the debug backend promises.
pub struct HashingEmbedder;

impl HashingEmbedder {
    pub const NAME: &'static str = "debug-hash";
    pub const DIMENSION: usize = 64;
}

impl EmbeddingBackend for HashingEmbedder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn dimension(&self) -> usize {
        Self::DIMENSION
    }

    fn embed(&self, texts: &[String], _batch_size: usize) -> ScratchResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let digest = Sha256::digest(text.as_bytes());
            let mut vector = Vec::with_capacity(Self::DIMENSION);
            for index in 0..Self::DIMENSION {
                let byte = digest[index % digest.len()];
                vector.push((byte as f32 / 127.5) - 1.0);
            }
            vectors.push(vector);
        }
        Ok(vectors)
    }
}

#[cfg(feature = "fastembed-backend")]
mod fastembed_backend {
    use super::*;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use parking_lot::Mutex;

    /// ONNX model backend via fastembed; 384 dimensions for the MiniLM
    /// family.
    pub struct FastEmbedBackend {
        model: Mutex<TextEmbedding>,
        name: String,
    }

    impl FastEmbedBackend {
        pub fn load(model_name: &str) -> ScratchResult<Self> {
            let model = TextEmbedding::try_new(
                InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false),
            )
            .map_err(|_| ScratchError::config("Unable to load embedding model"))?;
            Ok(Self {
                model: Mutex::new(model),
                name: model_name.to_string(),
            })
        }
    }

    impl EmbeddingBackend for FastEmbedBackend {
        fn name(&self) -> &str {
            &self.name
        }

        fn dimension(&self) -> usize {
            384
        }

        fn embed(&self, texts: &[String], batch_size: usize) -> ScratchResult<Vec<Vec<f32>>> {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            self.model
                .lock()
                .embed(refs, Some(batch_size))
                .map_err(|_| ScratchError::internal("Embedding generation failed"))
        }
    }
}

/// Select the backend for the configured model name.
pub fn select_backend(model_name: &str, _device: &str) -> ScratchResult<Arc<dyn EmbeddingBackend>> {
    if model_name.trim().to_ascii_lowercase().starts_with("debug") {
        return Ok(Arc::new(HashingEmbedder));
    }

    #[cfg(feature = "fastembed-backend")]
    {
        return Ok(Arc::new(fastembed_backend::FastEmbedBackend::load(
            model_name,
        )?));
    }

    #[cfg(not(feature = "fastembed-backend"))]
    Err(ScratchError::config(format!(
        "Embedding model '{model_name}' requires the fastembed-backend feature"
    )))
}
