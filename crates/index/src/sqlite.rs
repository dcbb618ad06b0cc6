//! SQLite vector store.
//!
//! A single `documents` table holds both collections:
//! - `collection` + `id` form the primary key
//! - `metadata` is a JSON object, filtered with `json_extract`
//! - `embedding` is a little-endian f32 blob
//!
//! Similarity is computed in Rust over the filtered rows. WAL mode lets
//! queries read while ingestion writes.

use crate::vector::rank_by_similarity;
use async_trait::async_trait;
use lectern_core::error::IndexError;
use lectern_core::index::{Collection, MetadataFilter, ScoredDocument, StoredDocument, VectorStore};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

pub struct SqliteStore {
    pool: SqlitePool,
}

/// A bind parameter produced from a metadata filter value.
enum Param {
    Text(String),
    Int(i64),
    Real(f64),
}

impl SqliteStore {
    /// Open (or create) a store at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, IndexError> {
        let in_memory = path.contains(":memory:");
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| IndexError::Unavailable(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Every connection to :memory: would see its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .connect_with(options)
            .await
            .map_err(|e| IndexError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite index opened at {path}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, IndexError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), IndexError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection  TEXT NOT NULL,
                id          TEXT NOT NULL,
                document    TEXT NOT NULL,
                metadata    TEXT NOT NULL DEFAULT '{}',
                embedding   BLOB NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IndexError::MigrationFailed(format!("documents table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_course \
             ON documents(collection, json_extract(metadata, '$.course_title'))",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IndexError::MigrationFailed(format!("course index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<StoredDocument, IndexError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| IndexError::QueryFailed(format!("id column: {e}")))?;
        let document: String = row
            .try_get("document")
            .map_err(|e| IndexError::QueryFailed(format!("document column: {e}")))?;
        let metadata_json: String = row
            .try_get("metadata")
            .map_err(|e| IndexError::QueryFailed(format!("metadata column: {e}")))?;
        let blob: Vec<u8> = row
            .try_get("embedding")
            .map_err(|e| IndexError::QueryFailed(format!("embedding column: {e}")))?;

        let metadata = match serde_json::from_str::<Value>(&metadata_json) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                return Err(IndexError::Storage(format!("corrupt metadata for document {id}")));
            }
        };

        Ok(StoredDocument {
            id,
            document,
            metadata,
            embedding: Self::blob_to_embedding(&blob),
        })
    }

    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    /// Translate filter clauses into SQL where possible.
    ///
    /// Clauses that can't be expressed (unusual keys, arrays, objects) are
    /// left out; callers re-check rows with [`MetadataFilter::matches`].
    fn filter_sql(filter: &MetadataFilter) -> (String, Vec<Param>) {
        let mut sql = String::new();
        let mut params = Vec::new();

        for (key, value) in filter.clauses() {
            if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                continue;
            }
            let column = format!("json_extract(metadata, '$.{key}')");
            let param = match value {
                Value::Null => {
                    sql.push_str(&format!(" AND {column} IS NULL"));
                    continue;
                }
                Value::Bool(b) => Param::Int(i64::from(*b)),
                Value::String(s) => Param::Text(s.clone()),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => Param::Int(i),
                    None => match n.as_f64() {
                        Some(f) => Param::Real(f),
                        None => continue,
                    },
                },
                Value::Array(_) | Value::Object(_) => continue,
            };
            sql.push_str(&format!(" AND {column} = ?"));
            params.push(param);
        }

        (sql, params)
    }

    async fn select_matching(
        &self,
        collection: Collection,
        filter: &MetadataFilter,
    ) -> Result<Vec<StoredDocument>, IndexError> {
        let (clause, params) = Self::filter_sql(filter);
        let sql = format!(
            "SELECT id, document, metadata, embedding FROM documents WHERE collection = ?{clause}"
        );

        let mut query = sqlx::query(&sql).bind(collection.as_str());
        for param in params {
            query = match param {
                Param::Text(s) => query.bind(s),
                Param::Int(i) => query.bind(i),
                Param::Real(f) => query.bind(f),
            };
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("{collection} scan: {e}")))?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in &rows {
            let doc = Self::row_to_document(row)?;
            if filter.matches(&doc.metadata) {
                documents.push(doc);
            }
        }
        Ok(documents)
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, collection: Collection, documents: Vec<StoredDocument>) -> Result<(), IndexError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IndexError::Storage(format!("begin transaction: {e}")))?;

        let count = documents.len();
        for doc in documents {
            let metadata = serde_json::to_string(&doc.metadata)
                .map_err(|e| IndexError::Storage(format!("metadata serialization: {e}")))?;

            sqlx::query(
                r#"
                INSERT INTO documents (collection, id, document, metadata, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(collection, id) DO UPDATE SET
                    document = excluded.document,
                    metadata = excluded.metadata,
                    embedding = excluded.embedding
                "#,
            )
            .bind(collection.as_str())
            .bind(&doc.id)
            .bind(&doc.document)
            .bind(&metadata)
            .bind(Self::embedding_to_blob(&doc.embedding))
            .execute(&mut *tx)
            .await
            .map_err(|e| IndexError::Storage(format!("INSERT failed: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| IndexError::Storage(format!("commit: {e}")))?;

        debug!(collection = %collection, count, "Upserted documents");
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        embedding: &[f32],
        filter: &MetadataFilter,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, IndexError> {
        let documents = self.select_matching(collection, filter).await?;
        Ok(rank_by_similarity(&documents, embedding, &MetadataFilter::new(), limit))
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredDocument>, IndexError> {
        let row = sqlx::query(
            "SELECT id, document, metadata, embedding FROM documents WHERE collection = ?1 AND id = ?2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IndexError::QueryFailed(format!("get {id}: {e}")))?;

        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn delete_where(&self, collection: Collection, filter: &MetadataFilter) -> Result<usize, IndexError> {
        let ids: Vec<String> = self
            .select_matching(collection, filter)
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect();

        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IndexError::Storage(format!("begin transaction: {e}")))?;
        for id in &ids {
            sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection.as_str())
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| IndexError::Storage(format!("DELETE failed: {e}")))?;
        }
        tx.commit()
            .await
            .map_err(|e| IndexError::Storage(format!("commit: {e}")))?;

        debug!(collection = %collection, removed = ids.len(), "Deleted documents");
        Ok(ids.len())
    }

    async fn ids(&self, collection: Collection) -> Result<Vec<String>, IndexError> {
        let rows = sqlx::query("SELECT id FROM documents WHERE collection = ?1 ORDER BY id")
            .bind(collection.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("{collection} ids: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get("id")
                    .map_err(|e| IndexError::QueryFailed(format!("id column: {e}")))
            })
            .collect()
    }

    async fn count(&self, collection: Collection) -> Result<usize, IndexError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM documents WHERE collection = ?1")
            .bind(collection.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("{collection} count: {e}")))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| IndexError::QueryFailed(format!("count column: {e}")))?;
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<(), IndexError> {
        sqlx::query("DELETE FROM documents")
            .execute(&self.pool)
            .await
            .map_err(|e| IndexError::Storage(format!("clear: {e}")))?;
        info!("Cleared SQLite index");
        Ok(())
    }
}
