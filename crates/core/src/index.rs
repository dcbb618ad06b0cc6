//! Vector index traits.
//!
//! [`VectorStore`] is the storage seam: named collections of embedded
//! documents with metadata equality filters. [`CourseSearch`] is the
//! read-side view the tools depend on.
//!
//! Implementations: in-memory (tests), SQLite (durable).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::course::{Course, SearchResults};
use crate::error::IndexError;

/// The two logical collections of the course index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// One entry per course, embedded by title.
    Catalog,
    /// One entry per chunk, embedded by tagged content.
    Content,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Catalog => "course_catalog",
            Collection::Content => "course_content",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document as stored in a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub document: String,
    pub metadata: serde_json::Map<String, Value>,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// A stored document with its similarity to the query vector.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: StoredDocument,
    pub similarity: f32,
}

/// Conjunction of metadata equality constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    clauses: Vec<(String, Value)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn matches(&self, metadata: &serde_json::Map<String, Value>) -> bool {
        self.clauses
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected))
    }
}

/// Storage for embedded documents, split into collections.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Insert or replace documents by id.
    async fn upsert(
        &self,
        collection: Collection,
        documents: Vec<StoredDocument>,
    ) -> std::result::Result<(), IndexError>;

    /// Nearest neighbours of `embedding` among documents matching `filter`,
    /// most similar first.
    async fn query(
        &self,
        collection: Collection,
        embedding: &[f32],
        filter: &MetadataFilter,
        limit: usize,
    ) -> std::result::Result<Vec<ScoredDocument>, IndexError>;

    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> std::result::Result<Option<StoredDocument>, IndexError>;

    /// Delete matching documents, returning how many were removed.
    async fn delete_where(
        &self,
        collection: Collection,
        filter: &MetadataFilter,
    ) -> std::result::Result<usize, IndexError>;

    async fn ids(&self, collection: Collection) -> std::result::Result<Vec<String>, IndexError>;

    async fn count(&self, collection: Collection) -> std::result::Result<usize, IndexError>;

    /// Drop every document in every collection.
    async fn clear(&self) -> std::result::Result<(), IndexError>;
}

/// Read access to the course index, as used by the LLM tools.
#[async_trait]
pub trait CourseSearch: Send + Sync {
    /// Semantic content search, optionally scoped to a course and lesson.
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults;

    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String>;

    async fn course_link(&self, course_title: &str) -> Option<String>;

    /// Resolve a loose course name and return the full course.
    async fn course_outline(
        &self,
        course_name: &str,
    ) -> std::result::Result<Option<Course>, IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, Value)]) -> serde_json::Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(MetadataFilter::new().matches(&serde_json::Map::new()));
    }

    #[test]
    fn filter_requires_every_clause() {
        let filter = MetadataFilter::new()
            .eq("course_title", "Rust Basics")
            .eq("lesson_number", 2);
        let hit = metadata(&[("course_title", "Rust Basics".into()), ("lesson_number", 2.into())]);
        let wrong_lesson = metadata(&[("course_title", "Rust Basics".into()), ("lesson_number", 3.into())]);
        let missing = metadata(&[("course_title", "Rust Basics".into())]);

        assert!(filter.matches(&hit));
        assert!(!filter.matches(&wrong_lesson));
        assert!(!filter.matches(&missing));
    }

    #[test]
    fn collection_names_are_stable() {
        assert_eq!(Collection::Catalog.to_string(), "course_catalog");
        assert_eq!(Collection::Content.as_str(), "course_content");
    }
}
