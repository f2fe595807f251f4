//! Embedding generation for semantic search and course-name resolution.

mod hashing;
mod openai;

pub use hashing::HashingEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, EmbeddingSettings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Build the embedder selected in settings.
pub fn from_settings(settings: &EmbeddingSettings) -> Arc<dyn Embedder> {
    match settings.provider {
        EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbedder::from_settings(settings)),
        EmbeddingProvider::Hashing => {
            Arc::new(HashingEmbedder::new(settings.dimensions as usize))
        }
    }
}
