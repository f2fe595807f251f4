//! Embeddings served by the OpenAI embeddings endpoint.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{CourseRagError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, CreateEmbeddingResponse, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Inputs sent per embeddings request.
const MAX_INPUTS_PER_REQUEST: usize = 100;

/// Embedder for catalog titles, lesson chunks and queries.
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: u32,
}

impl OpenAIEmbedder {
    /// Build from the `[embedding]` settings section.
    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        Self {
            client: create_client(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
        }
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(inputs.to_vec()))
            .dimensions(self.dimensions)
            .build()
            .map_err(|e| CourseRagError::Embedding(format!("Invalid embedding request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| CourseRagError::OpenAI(format!("Embedding API error: {}", e)))?;

        into_vectors(response, inputs.len())
    }
}

/// Vectors in input order; the endpoint tags each one with its input index.
fn into_vectors(response: CreateEmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in response.data {
        let index = item.index as usize;
        match slots.get_mut(index) {
            Some(slot) => *slot = Some(item.embedding),
            None => {
                return Err(CourseRagError::Embedding(format!(
                    "Embedding index {} out of range for {} inputs",
                    index, expected
                )))
            }
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or_else(|| CourseRagError::Embedding(format!("No embedding returned for input {}", i)))
        })
        .collect()
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| CourseRagError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for inputs in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            vectors.extend(self.request(inputs).await?);
        }
        debug!("Embedded {} texts", vectors.len());
        Ok(vectors)
    }
}
