//! End-to-end tests for the Lectern course assistant.
//!
//! These exercise the full pipeline: documents on disk are parsed, chunked
//! and written to a SQLite index, then questions run through the two-round
//! tool orchestration against a scripted provider.

use std::path::Path;
use std::sync::{Arc, Mutex};

use lectern_agent::CourseAssistant;
use lectern_core::course::Source;
use lectern_core::error::ProviderError;
use lectern_core::event::{DomainEvent, EventBus};
use lectern_core::message::{Message, MessageToolCall, Role};
use lectern_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use lectern_index::{CourseIndex, HashingEmbedder, SqliteStore};
use serde_json::json;

// ── Mock Provider ────────────────────────────────────────────────────────

/// Returns scripted responses in sequence and records every request.
struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn tool_then_text(tool_calls: Vec<MessageToolCall>, answer: &str) -> Self {
        Self::new(vec![tool_response(tool_calls), text_response(answer)])
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut responses = self.responses.lock().unwrap();
        let mut requests = self.requests.lock().unwrap();
        if responses.is_empty() {
            panic!("ScriptedProvider exhausted at call #{}", requests.len());
        }
        requests.push(request);
        Ok(responses.remove(0))
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
        metadata: serde_json::Map::new(),
    }
}

fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_tool_calls("", tool_calls),
        usage: usage(),
        model: "mock-model".into(),
        metadata: serde_json::Map::new(),
    }
}

fn tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: args.to_string(),
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

const MCP_COURSE: &str = "Course Title: MCP: Build Rich-Context AI Apps with Anthropic
Course Link: https://example.com/mcp
Course Instructor: Elie Schoppik

Lesson 0: Introduction
Lesson Link: https://example.com/mcp/0
The Model Context Protocol standardizes how applications give context to models.

Lesson 1: Why MCP
Lesson Link: https://example.com/mcp/1
MCP servers expose tools, resources and prompts. Clients connect to servers over a transport.
";

const RETRIEVAL_COURSE: &str = "Course Title: Advanced Retrieval for AI
Course Link: https://example.com/retrieval
Course Instructor: Anton Troynikov

Lesson 1: Overview of embeddings-based retrieval
Lesson Link: https://example.com/retrieval/1
Embeddings map text into vectors. Nearby vectors tend to share meaning.
";

fn write_docs(dir: &Path) {
    std::fs::write(dir.join("course1_script.txt"), MCP_COURSE).unwrap();
    std::fs::write(dir.join("course2_script.txt"), RETRIEVAL_COURSE).unwrap();
    std::fs::write(dir.join("notes.pdf"), "not a course").unwrap();
}

async fn sqlite_index(db: &Path) -> Arc<CourseIndex> {
    let store = SqliteStore::new(db.to_str().unwrap()).await.unwrap();
    Arc::new(CourseIndex::new(Arc::new(store), Arc::new(HashingEmbedder::default())))
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ingest_then_answer_with_lesson_citation() {
    let docs = tempfile::tempdir().unwrap();
    write_docs(docs.path());
    let db = docs.path().join("index.db");

    let provider = Arc::new(ScriptedProvider::tool_then_text(
        vec![tool_call(
            "call_1",
            "search_course_content",
            json!({"query": "what do MCP servers expose", "course_name": "MCP: Build Rich-Context AI Apps", "lesson_number": 1}),
        )],
        "Servers expose tools, resources and prompts.",
    ));
    let assistant = CourseAssistant::new(sqlite_index(&db).await, provider.clone(), "mock-model");

    let report = assistant.add_course_folder(docs.path(), false).await.unwrap();
    assert_eq!(report.courses_added, 2);
    assert!(report.chunks_added >= 3);

    let response = assistant.query("What do MCP servers expose?", None).await.unwrap();
    assert_eq!(response.answer, "Servers expose tools, resources and prompts.");
    assert_eq!(
        response.sources,
        vec![Source::new(
            "MCP: Build Rich-Context AI Apps with Anthropic - Lesson 1",
            Some("https://example.com/mcp/1".into())
        )]
    );

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.len(), 2);
    assert!(requests[1].tools.is_empty());

    // Round two sees the tool output, tagged with course and lesson
    let tool_msg = requests[1]
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("tool result in round two");
    assert!(tool_msg
        .content
        .starts_with("[MCP: Build Rich-Context AI Apps with Anthropic - Lesson 1]"));
}

#[tokio::test]
async fn outline_and_search_in_one_round() {
    let docs = tempfile::tempdir().unwrap();
    write_docs(docs.path());
    let db = docs.path().join("index.db");

    let provider = Arc::new(ScriptedProvider::tool_then_text(
        vec![
            tool_call("a", "get_course_outline", json!({"course_name": "retrieval"})),
            tool_call("b", "search_course_content", json!({"query": "embeddings", "course_name": "Quantum Chemistry"})),
        ],
        "Here is the outline.",
    ));
    let assistant = CourseAssistant::new(sqlite_index(&db).await, provider.clone(), "mock-model");
    assistant.add_course_folder(docs.path(), false).await.unwrap();

    let response = assistant.query("Outline of the retrieval course?", None).await.unwrap();
    assert_eq!(
        response.sources,
        vec![Source::new(
            "Advanced Retrieval for AI",
            Some("https://example.com/retrieval".into())
        )]
    );

    let requests = provider.requests();
    let tool_msgs: Vec<&Message> = requests[1].messages.iter().filter(|m| m.role == Role::Tool).collect();
    assert_eq!(tool_msgs.len(), 2);
    assert!(tool_msgs[0].content.contains("Lesson 1: Overview of embeddings-based retrieval"));
    assert!(tool_msgs[0].content.contains("Instructor: Anton Troynikov"));
    assert_eq!(tool_msgs[1].content, "No course found matching 'Quantum Chemistry'");
}

#[tokio::test]
async fn index_survives_restart() {
    let docs = tempfile::tempdir().unwrap();
    write_docs(docs.path());
    let db = docs.path().join("index.db");

    {
        let assistant = CourseAssistant::new(
            sqlite_index(&db).await,
            Arc::new(ScriptedProvider::new(vec![])),
            "mock-model",
        );
        assistant.add_course_folder(docs.path(), false).await.unwrap();
    }

    let assistant = CourseAssistant::new(
        sqlite_index(&db).await,
        Arc::new(ScriptedProvider::new(vec![])),
        "mock-model",
    );
    let analytics = assistant.analytics().await.unwrap();
    assert_eq!(analytics.total_courses, 2);
    assert_eq!(
        analytics.course_titles,
        vec![
            "Advanced Retrieval for AI".to_string(),
            "MCP: Build Rich-Context AI Apps with Anthropic".to_string(),
        ]
    );

    // A second pass without clearing adds nothing
    let report = assistant.add_course_folder(docs.path(), false).await.unwrap();
    assert_eq!(report.courses_added, 0);
    assert_eq!(report.skipped.len(), 2);

    // Clearing first rebuilds both courses
    let report = assistant.add_course_folder(docs.path(), true).await.unwrap();
    assert_eq!(report.courses_added, 2);
    assert!(report.skipped.is_empty());
}

#[tokio::test]
async fn direct_answer_publishes_events() {
    let docs = tempfile::tempdir().unwrap();
    write_docs(docs.path());
    let db = docs.path().join("index.db");

    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let assistant = CourseAssistant::with_event_bus(
        sqlite_index(&db).await,
        Arc::new(ScriptedProvider::new(vec![text_response("Hello!")])),
        "mock-model",
        Arc::clone(&bus),
    );
    assistant.add_course_folder(docs.path(), false).await.unwrap();

    let response = assistant.query("Hi there", None).await.unwrap();
    assert_eq!(response.answer, "Hello!");
    assert!(response.sources.is_empty());

    let mut ingested = 0;
    let mut generated = None;
    while let Ok(event) = rx.try_recv() {
        match event.as_ref() {
            DomainEvent::CourseIngested { .. } => ingested += 1,
            DomainEvent::ResponseGenerated { used_tools, session_id, .. } => {
                generated = Some((*used_tools, session_id.clone()));
            }
            _ => {}
        }
    }
    assert_eq!(ingested, 2);
    assert_eq!(generated, Some((false, response.session_id.to_string())));
}
