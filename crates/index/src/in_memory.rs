//! In-memory store: useful for testing and throwaway indexes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use async_trait::async_trait;
use lectern_core::error::IndexError;
use lectern_core::index::{Collection, MetadataFilter, ScoredDocument, StoredDocument, VectorStore};
use tokio::sync::RwLock;
use crate::vector::rank_by_similarity;

type Collections = HashMap<Collection, BTreeMap<String, StoredDocument>>;

/// Keeps every collection in a map behind one `RwLock`, so queries run
/// concurrently and ingestion takes exclusive access.
pub struct InMemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn upsert(&self, collection: Collection, documents: Vec<StoredDocument>) -> Result<(), IndexError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        for doc in documents {
            docs.insert(doc.id.clone(), doc);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        embedding: &[f32],
        filter: &MetadataFilter,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, IndexError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| rank_by_similarity(docs.values(), embedding, filter, limit))
            .unwrap_or_default())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredDocument>, IndexError> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn delete_where(&self, collection: Collection, filter: &MetadataFilter) -> Result<usize, IndexError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|_, doc| !filter.matches(&doc.metadata));
        Ok(before - docs.len())
    }

    async fn ids(&self, collection: Collection) -> Result<Vec<String>, IndexError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn count(&self, collection: Collection) -> Result<usize, IndexError> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).map_or(0, BTreeMap::len))
    }

    async fn clear(&self) -> Result<(), IndexError> {
        self.collections.write().await.clear();
        Ok(())
    }
}
