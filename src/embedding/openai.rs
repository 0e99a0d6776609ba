//! OpenAI embedding adapter.
//!
//! Embeddings are requested at a fixed width so they line up with the vectors
//! already serialized in the chunk store; a response that drops an input,
//! repeats an index, or comes back at the wrong width is rejected before
//! anything is stored.

use super::Embedder;
use crate::error::{PodkastError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Per-request input cap imposed by the embeddings API.
const MAX_BATCH: usize = 100;

/// Embeds text through the OpenAI embeddings API.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn with_config(model: &str, dimensions: usize) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            dimensions,
        }
    }

    /// One API round trip; returns (index-within-batch, vector) pairs.
    async fn request_batch(&self, batch: &[String]) -> Result<Vec<(u32, Vec<f32>)>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(batch.to_vec()))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| PodkastError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| PodkastError::OpenAI(format!("Embedding API error: {}", e)))?;

        Ok(response
            .data
            .into_iter()
            .map(|d| (d.index, d.embedding))
            .collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| PodkastError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows = Vec::with_capacity(texts.len());
        for (batch_number, batch) in texts.chunks(MAX_BATCH).enumerate() {
            let base = (batch_number * MAX_BATCH) as u32;
            for (index, embedding) in self.request_batch(batch).await? {
                rows.push((base + index, embedding));
            }
        }

        debug!(
            "Embedded {} texts as {}-wide vectors",
            texts.len(),
            self.dimensions
        );

        collate(texts.len(), self.dimensions, rows)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Reassemble response rows into input order and check the shape: exactly one
/// vector per input, each at the requested width.
fn collate(expected: usize, width: usize, mut rows: Vec<(u32, Vec<f32>)>) -> Result<Vec<Vec<f32>>> {
    if rows.len() != expected {
        return Err(PodkastError::Embedding(format!(
            "Expected {} embeddings, got {}",
            expected,
            rows.len()
        )));
    }

    rows.sort_by_key(|(index, _)| *index);

    rows.into_iter()
        .enumerate()
        .map(|(position, (index, embedding))| {
            if index as usize != position {
                return Err(PodkastError::Embedding(format!(
                    "Embedding response is missing input {}",
                    position
                )));
            }
            if embedding.len() != width {
                return Err(PodkastError::Embedding(format!(
                    "Embedding for input {} has {} dimensions, expected {}",
                    position,
                    embedding.len(),
                    width
                )));
            }
            Ok(embedding)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collate_restores_input_order() {
        let rows = vec![
            (2, vec![2.0, 2.0]),
            (0, vec![0.0, 0.0]),
            (1, vec![1.0, 1.0]),
        ];
        let ordered = collate(3, 2, rows).unwrap();
        assert_eq!(ordered, vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0]]);
    }

    #[test]
    fn test_collate_rejects_dropped_input() {
        let err = collate(2, 2, vec![(0, vec![0.0, 0.0])]).unwrap_err();
        assert!(err.to_string().contains("Expected 2 embeddings"));

        // Same count but a duplicated index still means an input was dropped.
        let rows = vec![(0, vec![0.0, 0.0]), (0, vec![0.5, 0.5])];
        let err = collate(2, 2, rows).unwrap_err();
        assert!(err.to_string().contains("missing input 1"));
    }

    #[test]
    fn test_collate_rejects_wrong_width() {
        let rows = vec![(0, vec![0.0, 0.0]), (1, vec![1.0])];
        let err = collate(2, 2, rows).unwrap_err();
        assert!(err.to_string().contains("expected 2"));
    }

    #[test]
    fn test_embedder_reports_configured_width() {
        let embedder = OpenAIEmbedder::with_config("text-embedding-3-large", 3072);
        assert_eq!(embedder.dimensions(), 3072);
    }
}
