//! The course assistant: ingestion, querying and analytics in one place.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use lectern_config::AppConfig;
use lectern_core::course::{Course, CourseChunk, Source};
use lectern_core::embedding::Embedder;
use lectern_core::event::{DomainEvent, EventBus};
use lectern_core::index::VectorStore;
use lectern_core::message::SessionId;
use lectern_core::provider::Provider;
use lectern_core::{Error, Result};
use lectern_index::{CourseIndex, HashingEmbedder, InMemoryStore, ProviderEmbedder, SqliteStore};
#[cfg(feature = "local-embeddings")]
use lectern_index::LocalEmbedder;
use lectern_ingest::{process_document, process_folder, read_document, ChunkConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::orchestrator::Orchestrator;
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderReport {
    pub courses_added: usize,
    pub chunks_added: usize,
    /// Titles already in the index, left untouched.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

pub struct CourseAssistant {
    index: Arc<CourseIndex>,
    sessions: Arc<SessionStore>,
    orchestrator: Orchestrator,
    chunk_config: ChunkConfig,
    event_bus: Arc<EventBus>,
}

impl CourseAssistant {
    /// Assemble an assistant answering with `model` on `provider`.
    pub fn new(index: Arc<CourseIndex>, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self::with_event_bus(index, provider, model, Arc::new(EventBus::default()))
    }

    pub fn with_event_bus(
        index: Arc<CourseIndex>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let tools = Arc::new(lectern_tools::course_registry(index.clone()));
        Self {
            orchestrator: Orchestrator::new(provider, model, tools, event_bus.clone()),
            index,
            sessions: Arc::new(SessionStore::default()),
            chunk_config: ChunkConfig::default(),
            event_bus,
        }
    }

    pub fn with_chunk_config(mut self, chunk_config: ChunkConfig) -> Self {
        self.chunk_config = chunk_config;
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.sessions = Arc::new(SessionStore::new(max_history));
        self
    }

    pub fn with_generation(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.orchestrator = self
            .orchestrator
            .with_temperature(temperature)
            .with_max_tokens(max_tokens);
        self
    }

    /// Build the whole stack from configuration: provider, embedder,
    /// vector store and index.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let mut router = lectern_providers::build_from_config(config);
        let provider = router.default().ok_or_else(|| Error::Config {
            message: format!("provider '{}' is not available", config.default_provider),
        })?;

        let embedder: Arc<dyn Embedder> = match config.embedding.provider.as_str() {
            #[cfg(feature = "local-embeddings")]
            "local" => Arc::new(LocalEmbedder::new(&config.embedding.model, config.embedding.batch_size)?),
            #[cfg(not(feature = "local-embeddings"))]
            "local" => {
                return Err(Error::Config {
                    message: "embedding.provider = \"local\" needs the `local-embeddings` feature".into(),
                });
            }
            "hashing" => Arc::new(HashingEmbedder::new(config.embedding.dimensions)),
            name => {
                let api_key = config.providers.get(name).and_then(|p| p.api_key.clone());
                let remote = router.get_or_create(name, api_key.as_deref().or(config.api_key.as_deref()));
                Arc::new(ProviderEmbedder::new(remote, config.embedding.model.clone()))
            }
        };

        let store: Arc<dyn VectorStore> = match config.index.backend.as_str() {
            "sqlite" => Arc::new(SqliteStore::new(&config.index.path).await?),
            "memory" => Arc::new(InMemoryStore::new()),
            other => {
                return Err(Error::Config {
                    message: format!("unknown index backend '{other}'"),
                });
            }
        };

        let index = CourseIndex::new(store, embedder)
            .with_max_results(config.rag.max_search_results)
            .with_course_match_threshold(config.rag.course_match_threshold)
            .with_batch_size(config.embedding.batch_size);

        info!(
            provider = %config.default_provider,
            model = %config.default_model,
            embedder = %config.embedding.provider,
            index = %config.index.backend,
            "Course assistant ready"
        );

        Ok(Self::new(Arc::new(index), provider, config.default_model.clone())
            .with_chunk_config(ChunkConfig {
                chunk_size: config.rag.chunk_size,
                chunk_overlap: config.rag.chunk_overlap,
            })
            .with_max_history(config.rag.max_history_exchanges)
            .with_generation(config.temperature, config.max_tokens))
    }

    pub fn index(&self) -> &Arc<CourseIndex> {
        &self.index
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    async fn index_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<usize> {
        self.index.add_course(course).await?;
        let written = self.index.add_chunks(chunks).await?;
        self.event_bus.publish(DomainEvent::CourseIngested {
            course_title: course.title.clone(),
            lesson_count: course.lessons.len(),
            chunk_count: written,
            timestamp: chrono::Utc::now(),
        });
        Ok(written)
    }

    /// Ingest one document, replacing any course with the same title.
    pub async fn add_course_document(&self, path: &Path) -> Result<(Course, usize)> {
        let raw = read_document(path).await?;
        let (course, chunks) = process_document(&raw, &self.chunk_config)?;
        let written = self.index_course(&course, &chunks).await?;
        Ok((course, written))
    }

    /// Ingest every document in `folder`.
    ///
    /// Courses already in the index are skipped unless `clear_existing`
    /// wipes the index first.
    pub async fn add_course_folder(&self, folder: &Path, clear_existing: bool) -> Result<FolderReport> {
        if clear_existing {
            self.index.clear().await?;
        }

        let existing: HashSet<String> = self.index.list_course_titles().await?.into_iter().collect();
        let mut report = FolderReport::default();

        for processed in process_folder(folder, &self.chunk_config).await? {
            if existing.contains(&processed.course.title) {
                debug!(course = %processed.course.title, "Course already indexed");
                report.skipped.push(processed.course.title);
                continue;
            }
            report.chunks_added += self.index_course(&processed.course, &processed.chunks).await?;
            report.courses_added += 1;
        }

        info!(
            folder = %folder.display(),
            courses = report.courses_added,
            chunks = report.chunks_added,
            skipped = report.skipped.len(),
            "Folder ingested"
        );
        Ok(report)
    }

    /// Answer a question, continuing `session_id` or starting a session.
    pub async fn query(&self, query: &str, session_id: Option<SessionId>) -> Result<QueryResponse> {
        let session_id = match session_id {
            Some(id) => id,
            None => self.sessions.create_session().await,
        };
        let history = self.sessions.get_history(&session_id).await;

        let generation = self
            .orchestrator
            .generate(query, history.as_deref(), &session_id)
            .await?;

        self.sessions
            .add_exchange(&session_id, query, &generation.answer)
            .await;

        Ok(QueryResponse {
            answer: generation.answer,
            sources: generation.sources,
            session_id,
        })
    }

    pub async fn analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.index.list_course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use serde_json::json;

    fn assistant(provider: Arc<SequentialMockProvider>) -> CourseAssistant {
        let index = CourseIndex::new(Arc::new(InMemoryStore::new()), Arc::new(HashingEmbedder::default()));
        CourseAssistant::new(Arc::new(index), provider as Arc<dyn Provider>, "mock-model")
    }

    fn write_docs(dir: &Path) {
        std::fs::write(dir.join("testing.txt"), TESTING_COURSE).unwrap();
        std::fs::write(
            dir.join("rust.md"),
            "Course Title: Rust Basics\nCourse Link: https://example.com/rust\n\nLesson 1: Ownership\nValues have one owner.",
        )
        .unwrap();
        std::fs::write(dir.join("broken.txt"), "\n \n").unwrap();
    }

    #[tokio::test]
    async fn folder_ingestion_skips_existing_courses() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());
        let assistant = assistant(Arc::new(SequentialMockProvider::new(vec![])));

        let first = assistant.add_course_folder(dir.path(), false).await.unwrap();
        assert_eq!(first.courses_added, 2);
        assert!(first.chunks_added >= 3);
        assert!(first.skipped.is_empty());

        let second = assistant.add_course_folder(dir.path(), false).await.unwrap();
        assert_eq!(second.courses_added, 0);
        assert_eq!(second.skipped, vec!["Rust Basics".to_string(), "Intro to Testing".to_string()]);

        let cleared = assistant.add_course_folder(dir.path(), true).await.unwrap();
        assert_eq!(cleared.courses_added, 2);
        assert_eq!(cleared.chunks_added, first.chunks_added);

        let analytics = assistant.analytics().await.unwrap();
        assert_eq!(analytics.total_courses, 2);
        assert_eq!(analytics.course_titles, vec!["Intro to Testing".to_string(), "Rust Basics".to_string()]);
    }

    #[tokio::test]
    async fn missing_folder_is_an_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = assistant(Arc::new(SequentialMockProvider::new(vec![])));
        let report = assistant.add_course_folder(&dir.path().join("missing"), false).await.unwrap();
        assert_eq!(report, FolderReport::default());
    }

    #[tokio::test]
    async fn reingesting_a_document_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testing.txt");
        std::fs::write(&path, TESTING_COURSE).unwrap();
        let assistant = assistant(Arc::new(SequentialMockProvider::new(vec![])));

        let (course, first) = assistant.add_course_document(&path).await.unwrap();
        let (_, second) = assistant.add_course_document(&path).await.unwrap();
        assert_eq!(course.title, "Intro to Testing");
        assert_eq!(first, second);

        let store = assistant.index().store();
        assert_eq!(store.count(lectern_core::Collection::Content).await.unwrap(), first);
        assert_eq!(assistant.analytics().await.unwrap().total_courses, 1);
    }

    #[tokio::test]
    async fn malformed_document_is_a_document_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "").unwrap();
        let assistant = assistant(Arc::new(SequentialMockProvider::new(vec![])));
        let err = assistant.add_course_document(&path).await.unwrap_err();
        assert!(matches!(err, Error::Document(_)));
    }

    #[tokio::test]
    async fn intro_to_testing_scenario() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());
        let call = make_tool_call(
            "call_1",
            "search_course_content",
            json!({"query": "unit tests", "course_name": "intro", "lesson_number": 1}),
        );
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(vec![call], "They test one function."));
        let assistant = assistant(provider.clone());
        assistant.add_course_folder(dir.path(), false).await.unwrap();

        let response = assistant.query("What do unit tests check?", None).await.unwrap();
        assert_eq!(response.answer, "They test one function.");
        assert_eq!(
            response.sources,
            vec![Source::new("Intro to Testing - Lesson 1", Some("https://example.com/testing/1".into()))]
        );
        assert_eq!(
            assistant.sessions().get_history(&response.session_id).await.as_deref(),
            Some("User: What do unit tests check?\nAssistant: They test one function.")
        );
    }

    #[tokio::test]
    async fn sources_do_not_leak_into_the_next_query() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());
        let call = make_tool_call("c1", "search_course_content", json!({"query": "ownership"}));
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![call], ""),
            make_text_response("One owner."),
            make_text_response("Hello!"),
        ]));
        let assistant = assistant(provider.clone());
        assistant.add_course_folder(dir.path(), false).await.unwrap();

        let first = assistant.query("Ownership?", None).await.unwrap();
        assert!(!first.sources.is_empty());

        let second = assistant.query("Hi", Some(first.session_id.clone())).await.unwrap();
        assert!(second.sources.is_empty());
        assert_eq!(second.session_id, first.session_id);

        // The second round-1 request carries the first exchange as history
        let system = &provider.requests()[2].messages[0].content;
        assert!(system.contains("Previous conversation:\nUser: Ownership?\nAssistant: One owner."));
    }

    #[tokio::test]
    async fn generation_failure_leaves_session_untouched() {
        let provider = Arc::new(SequentialMockProvider::scripted(vec![Err(
            lectern_core::error::ProviderError::RateLimited { retry_after_secs: 3 },
        )]));
        let assistant = assistant(provider);
        let id = assistant.sessions().create_session().await;
        let err = assistant.query("?", Some(id.clone())).await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert!(assistant.sessions().get_history(&id).await.is_none());
    }

    #[tokio::test]
    async fn from_config_with_memory_backend() {
        let mut config = AppConfig::default();
        config.index.backend = "memory".into();
        config.api_key = Some("test-key".into());
        let assistant = CourseAssistant::from_config(&config).await.unwrap();
        assert_eq!(assistant.analytics().await.unwrap().total_courses, 0);
        assert_eq!(assistant.index().max_results(), 5);
    }

    #[tokio::test]
    async fn from_config_defaults_to_local_sentence_embeddings() {
        let mut config = AppConfig::default();
        config.index.backend = "memory".into();
        assert_eq!(config.embedding.provider, "local");
        assert!(CourseAssistant::from_config(&config).await.is_ok());

        config.embedding.model = "word2vec".into();
        let err = CourseAssistant::from_config(&config).await.err().unwrap();
        assert!(matches!(err, Error::Index(_)));
        assert!(err.to_string().contains("word2vec"));
    }

    #[tokio::test]
    async fn from_config_rejects_unknown_backend() {
        let mut config = AppConfig::default();
        config.index.backend = "cassandra".into();
        assert!(matches!(CourseAssistant::from_config(&config).await, Err(Error::Config { .. })));
    }
}
