//! The course index: catalog + content collections behind one embedder.

use std::sync::Arc;
use async_trait::async_trait;
use lectern_core::course::{Course, CourseChunk, Lesson, SearchHit, SearchResults};
use lectern_core::embedding::Embedder;
use lectern_core::error::IndexError;
use lectern_core::index::{Collection, CourseSearch, MetadataFilter, StoredDocument, VectorStore};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

pub struct CourseIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
    course_match_threshold: f32,
    batch_size: usize,
}

impl CourseIndex {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            max_results: 5,
            course_match_threshold: 0.25,
            batch_size: 64,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Minimum cosine similarity for a loose course name to resolve.
    pub fn with_course_match_threshold(mut self, threshold: f32) -> Self {
        self.course_match_threshold = threshold;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Map a partial or approximate course name to an indexed title.
    pub async fn resolve_course_name(&self, course_name: &str) -> Result<Option<String>, IndexError> {
        let query = self.embedder.embed_one(course_name).await?;
        let best = self
            .store
            .query(Collection::Catalog, &query, &MetadataFilter::new(), 1)
            .await?;

        let Some(top) = best.into_iter().next() else {
            return Ok(None);
        };
        if top.similarity < self.course_match_threshold {
            debug!(
                course_name,
                candidate = %top.document.id,
                similarity = top.similarity,
                "Course match below threshold"
            );
            return Ok(None);
        }
        Ok(Some(top.document.id))
    }

    async fn search_inner(
        &self,
        query: &str,
        course_title: Option<String>,
        lesson_number: Option<u32>,
    ) -> Result<Vec<SearchHit>, IndexError> {
        let mut filter = MetadataFilter::new();
        if let Some(title) = course_title {
            filter = filter.eq("course_title", title);
        }
        if let Some(n) = lesson_number {
            filter = filter.eq("lesson_number", n);
        }

        let embedding = self.embedder.embed_one(query).await?;
        let scored = self
            .store
            .query(Collection::Content, &embedding, &filter, self.max_results)
            .await?;

        Ok(scored
            .into_iter()
            .map(|s| SearchHit {
                content: s.document.document,
                metadata: s.document.metadata,
                distance: 1.0 - s.similarity,
            })
            .collect())
    }

    /// Register a course in the catalog, dropping any chunks a previous
    /// version of the same title left behind.
    pub async fn add_course(&self, course: &Course) -> Result<(), IndexError> {
        let removed = self
            .store
            .delete_where(
                Collection::Content,
                &MetadataFilter::new().eq("course_title", course.title.as_str()),
            )
            .await?;
        if removed > 0 {
            debug!(course = %course.title, removed, "Replaced previous course content");
        }

        let lessons_json = serde_json::to_string(&course.lessons)
            .map_err(|e| IndexError::Storage(format!("lesson serialization: {e}")))?;

        let mut metadata = Map::new();
        metadata.insert("title".into(), course.title.clone().into());
        metadata.insert("instructor".into(), course.instructor.clone().map_or(Value::Null, Value::from));
        metadata.insert("course_link".into(), course.course_link.clone().map_or(Value::Null, Value::from));
        metadata.insert("lessons_json".into(), lessons_json.into());
        metadata.insert("lesson_count".into(), course.lessons.len().into());

        let embedding = self.embedder.embed_one(&course.title).await?;
        self.store
            .upsert(
                Collection::Catalog,
                vec![StoredDocument {
                    id: course.title.clone(),
                    document: course.title.clone(),
                    metadata,
                    embedding,
                }],
            )
            .await?;

        info!(course = %course.title, lessons = course.lessons.len(), "Course added to catalog");
        Ok(())
    }

    /// Embed and store chunks, returning how many were written.
    pub async fn add_chunks(&self, chunks: &[CourseChunk]) -> Result<usize, IndexError> {
        let mut written = 0;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(IndexError::Embedding(format!(
                    "{} returned {} vectors for {} chunks",
                    self.embedder.name(),
                    embeddings.len(),
                    batch.len()
                )));
            }

            let documents = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| {
                    let mut metadata = Map::new();
                    metadata.insert("course_title".into(), chunk.course_title.clone().into());
                    metadata.insert(
                        "lesson_number".into(),
                        chunk.lesson_number.map_or(Value::Null, Value::from),
                    );
                    metadata.insert("chunk_index".into(), chunk.chunk_index.into());
                    StoredDocument {
                        id: chunk.id(),
                        document: chunk.content.clone(),
                        metadata,
                        embedding,
                    }
                })
                .collect();

            self.store.upsert(Collection::Content, documents).await?;
            written += batch.len();
        }

        debug!(count = written, "Chunks indexed");
        Ok(written)
    }

    pub async fn list_course_titles(&self) -> Result<Vec<String>, IndexError> {
        let mut titles = self.store.ids(Collection::Catalog).await?;
        titles.sort();
        Ok(titles)
    }

    pub async fn course_count(&self) -> Result<usize, IndexError> {
        self.store.count(Collection::Catalog).await
    }

    /// Rebuild a course from its catalog entry.
    pub async fn get_course(&self, title: &str) -> Result<Option<Course>, IndexError> {
        let Some(entry) = self.store.get(Collection::Catalog, title).await? else {
            return Ok(None);
        };

        let text = |key: &str| entry.metadata.get(key).and_then(Value::as_str).map(str::to_string);
        let lessons: Vec<Lesson> = match entry.metadata.get("lessons_json").and_then(Value::as_str) {
            Some(json) => serde_json::from_str(json)
                .map_err(|e| IndexError::Storage(format!("corrupt lessons for '{title}': {e}")))?,
            None => Vec::new(),
        };

        Ok(Some(Course {
            title: text("title").unwrap_or_else(|| entry.id.clone()),
            instructor: text("instructor"),
            course_link: text("course_link"),
            lessons,
        }))
    }

    pub async fn clear(&self) -> Result<(), IndexError> {
        self.store.clear().await?;
        info!("Course index cleared");
        Ok(())
    }
}

#[async_trait]
impl CourseSearch for CourseIndex {
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults {
        let course_title = match course_name {
            Some(name) => match self.resolve_course_name(name).await {
                Ok(Some(title)) => Some(title),
                Ok(None) => {
                    return SearchResults::empty_with_error(format!("No course found matching '{name}'"));
                }
                Err(e) => {
                    warn!(error = %e, "Course resolution failed");
                    return SearchResults::empty_with_error(format!("Search error: {e}"));
                }
            },
            None => None,
        };

        match self.search_inner(query, course_title, lesson_number).await {
            Ok(hits) => {
                debug!(query, hits = hits.len(), "Content search");
                SearchResults::from_hits(hits)
            }
            Err(e) => {
                warn!(error = %e, "Content search failed");
                SearchResults::empty_with_error(format!("Search error: {e}"))
            }
        }
    }

    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String> {
        match self.get_course(course_title).await {
            Ok(course) => course?.lesson(lesson_number)?.lesson_link.clone(),
            Err(e) => {
                warn!(error = %e, course = course_title, "Lesson link lookup failed");
                None
            }
        }
    }

    async fn course_link(&self, course_title: &str) -> Option<String> {
        match self.get_course(course_title).await {
            Ok(course) => course?.course_link,
            Err(e) => {
                warn!(error = %e, course = course_title, "Course link lookup failed");
                None
            }
        }
    }

    async fn course_outline(&self, course_name: &str) -> Result<Option<Course>, IndexError> {
        match self.resolve_course_name(course_name).await? {
            Some(title) => self.get_course(&title).await,
            None => Ok(None),
        }
    }
}
