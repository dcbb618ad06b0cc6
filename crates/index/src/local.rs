//! In-process sentence embeddings via fastembed.
//!
//! The ONNX model is downloaded on first use and cached by fastembed; after
//! that no network access is needed. Loading happens lazily inside a
//! blocking task so that building an index never stalls on a download.

use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use lectern_core::embedding::Embedder;
use lectern_core::error::IndexError;
use tracing::{debug, info};

pub const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";

/// Map a config model name to a fastembed model.
fn model_from_name(name: &str) -> Result<EmbeddingModel, IndexError> {
    match name.to_ascii_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        other => Err(IndexError::Embedding(format!(
            "unknown local embedding model '{other}' (try {DEFAULT_LOCAL_MODEL})"
        ))),
    }
}

pub struct LocalEmbedder {
    name: String,
    model: EmbeddingModel,
    batch_size: usize,
    engine: Arc<Mutex<Option<TextEmbedding>>>,
}

impl LocalEmbedder {
    pub fn new(model_name: &str, batch_size: usize) -> Result<Self, IndexError> {
        let model = model_from_name(model_name)?;
        Ok(Self {
            name: model_name.to_ascii_lowercase(),
            model,
            batch_size: batch_size.max(1),
            engine: Arc::new(Mutex::new(None)),
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let engine = Arc::clone(&self.engine);
        let model = self.model.clone();
        let name = self.name.clone();
        let batch_size = self.batch_size;
        let texts = texts.to_vec();
        let count = texts.len();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut guard = engine
                .lock()
                .map_err(|_| IndexError::Embedding(format!("{name}: model lock poisoned")))?;
            if guard.is_none() {
                info!(model = %name, "Loading local embedding model");
                let loaded = TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(false))
                    .map_err(|e| IndexError::Embedding(format!("failed to load {name}: {e}")))?;
                *guard = Some(loaded);
            }
            let Some(text_embedding) = guard.as_mut() else {
                return Err(IndexError::Embedding(format!("{name}: model not loaded")));
            };
            text_embedding
                .embed(texts, Some(batch_size))
                .map_err(|e| IndexError::Embedding(format!("{name}: {e}")))
        })
        .await
        .map_err(|e| IndexError::Embedding(format!("embedding task failed: {e}")))??;

        if vectors.len() != count {
            return Err(IndexError::Embedding(format!(
                "expected {count} vectors from {}, got {}",
                self.name,
                vectors.len()
            )));
        }
        debug!(model = %self.name, count, "Embedded batch locally");
        Ok(vectors)
    }
}
