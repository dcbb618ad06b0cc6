//! Remote embeddings through any [`Provider`] with an embeddings endpoint.

use std::sync::Arc;
use async_trait::async_trait;
use lectern_core::embedding::Embedder;
use lectern_core::error::IndexError;
use lectern_core::provider::{EmbeddingRequest, Provider};
use tracing::debug;

pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await
            .map_err(|e| IndexError::Embedding(format!("{}: {e}", self.provider.name())))?;

        if response.embeddings.len() != texts.len() {
            return Err(IndexError::Embedding(format!(
                "expected {} vectors from {}, got {}",
                texts.len(),
                self.provider.name(),
                response.embeddings.len()
            )));
        }

        debug!(provider = self.provider.name(), model = %self.model, count = texts.len(), "Embedded batch");
        Ok(response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::error::ProviderError;
    use lectern_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    /// Returns one vector per input whose single value is the input length.
    struct LengthProvider {
        drop_last: bool,
    }

    #[async_trait]
    impl Provider for LengthProvider {
        fn name(&self) -> &str {
            "length"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("no chat".into()))
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            let mut embeddings: Vec<Vec<f32>> =
                request.inputs.iter().map(|t| vec![t.len() as f32]).collect();
            if self.drop_last {
                embeddings.pop();
            }
            Ok(EmbeddingResponse { embeddings, model: request.model, usage: None })
        }
    }

    struct ChatOnlyProvider;

    #[async_trait]
    impl Provider for ChatOnlyProvider {
        fn name(&self) -> &str {
            "chat-only"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("unused".into()))
        }
    }

    #[tokio::test]
    async fn forwards_batches() {
        let embedder = ProviderEmbedder::new(Arc::new(LengthProvider { drop_last: false }), "m");
        let out = embedder.embed(&["ab".into(), "abcd".into()]).await.unwrap();
        assert_eq!(out, vec![vec![2.0], vec![4.0]]);
        assert_eq!(embedder.name(), "m");
    }

    #[tokio::test]
    async fn count_mismatch_is_an_error() {
        let embedder = ProviderEmbedder::new(Arc::new(LengthProvider { drop_last: true }), "m");
        let err = embedder.embed(&["a".into(), "b".into()]).await.unwrap_err();
        assert!(matches!(err, IndexError::Embedding(_)));
    }

    #[tokio::test]
    async fn provider_without_embeddings_surfaces_embedding_error() {
        let embedder = ProviderEmbedder::new(Arc::new(ChatOnlyProvider), "m");
        let err = embedder.embed_one("hello").await.unwrap_err();
        assert!(err.to_string().contains("does not support embeddings"));
    }
}
