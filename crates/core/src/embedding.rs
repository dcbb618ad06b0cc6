//! Embedder trait: turns text into vectors for the index.

use async_trait::async_trait;
use crate::error::IndexError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the model behind this embedder.
    fn name(&self) -> &str;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, IndexError>;

    async fn embed_one(&self, text: &str) -> std::result::Result<Vec<f32>, IndexError> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| IndexError::Embedding(format!("{} returned no vector", self.name())))
    }
}
