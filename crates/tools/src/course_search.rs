//! Content search tool: semantic search over course chunks with optional
//! course and lesson filters.

use std::sync::Arc;
use async_trait::async_trait;
use lectern_core::course::{SearchResults, Source};
use lectern_core::error::ToolError;
use lectern_core::index::CourseSearch;
use lectern_core::tool::{Tool, ToolResult};
use serde_json::Value;
use tracing::debug;

pub struct CourseSearchTool {
    index: Arc<dyn CourseSearch>,
}

impl CourseSearchTool {
    pub fn new(index: Arc<dyn CourseSearch>) -> Self {
        Self { index }
    }

    async fn format_results(&self, results: &SearchResults) -> (String, Vec<Source>) {
        let mut blocks = Vec::with_capacity(results.len());
        let mut sources = Vec::with_capacity(results.len());

        for hit in &results.hits {
            let (header, source) = match (hit.course_title(), hit.lesson_number()) {
                (Some(course), Some(n)) => (
                    format!("[{course} - Lesson {n}]"),
                    Source::new(format!("{course} - Lesson {n}"), self.index.lesson_link(course, n).await),
                ),
                (Some(course), None) => (
                    format!("[{course}]"),
                    Source::new(course, self.index.course_link(course).await),
                ),
                (None, _) => ("[unknown]".to_string(), Source::new("unknown", None)),
            };
            blocks.push(format!("{header}\n{}", hit.content));
            sources.push(source);
        }

        (blocks.join("\n\n"), sources)
    }
}

fn optional_lesson(arguments: &Value) -> Result<Option<u32>, ToolError> {
    match arguments.get("lesson_number") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ToolError::InvalidArguments(format!("'lesson_number' must be a non-negative integer, got {v}"))),
    }
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn name(&self) -> &str {
        "search_course_content"
    }

    fn description(&self) -> &str {
        "Search course materials with smart course name matching and lesson filtering"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for in the course content"
                },
                "course_name": {
                    "type": "string",
                    "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                },
                "lesson_number": {
                    "type": "integer",
                    "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let course_name = arguments["course_name"].as_str().filter(|s| !s.trim().is_empty());
        let lesson_number = optional_lesson(&arguments)?;

        let results = self.index.search(query, course_name, lesson_number).await;

        if let Some(error) = results.error {
            return Ok(ToolResult::failed(error));
        }

        if results.is_empty() {
            let mut message = String::from("No relevant content found");
            if let Some(course) = course_name {
                message.push_str(&format!(" in course '{course}'"));
            }
            if let Some(n) = lesson_number {
                message.push_str(&format!(" in lesson {n}"));
            }
            message.push('.');
            return Ok(ToolResult::ok(message));
        }

        let (output, sources) = self.format_results(&results).await;
        debug!(query, hits = results.len(), "Course content search");
        Ok(ToolResult::ok(output).with_sources(sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::course::{Course, SearchHit};
    use lectern_core::error::IndexError;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns canned results and records the last search arguments.
    #[derive(Default)]
    struct FakeIndex {
        results: SearchResults,
        last_call: Mutex<Option<(String, Option<String>, Option<u32>)>>,
    }

    #[async_trait]
    impl CourseSearch for FakeIndex {
        async fn search(&self, query: &str, course_name: Option<&str>, lesson_number: Option<u32>) -> SearchResults {
            *self.last_call.lock().unwrap() =
                Some((query.to_string(), course_name.map(str::to_string), lesson_number));
            self.results.clone()
        }

        async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String> {
            Some(format!("https://example.com/{course_title}/{lesson_number}"))
        }

        async fn course_link(&self, course_title: &str) -> Option<String> {
            Some(format!("https://example.com/{course_title}"))
        }

        async fn course_outline(&self, _course_name: &str) -> Result<Option<Course>, IndexError> {
            Ok(None)
        }
    }

    fn hit(course: Option<&str>, lesson: Option<u32>, content: &str) -> SearchHit {
        let mut metadata = serde_json::Map::new();
        if let Some(course) = course {
            metadata.insert("course_title".into(), course.into());
        }
        metadata.insert("lesson_number".into(), lesson.map_or(Value::Null, Value::from));
        SearchHit { content: content.into(), metadata, distance: 0.2 }
    }

    fn tool(results: SearchResults) -> (CourseSearchTool, Arc<FakeIndex>) {
        let index = Arc::new(FakeIndex { results, ..Default::default() });
        (CourseSearchTool::new(index.clone()), index)
    }

    #[tokio::test]
    async fn formats_hits_with_headers_and_sources() {
        let (tool, _) = tool(SearchResults::from_hits(vec![
            hit(Some("Rust"), Some(1), "Ownership moves values."),
            hit(Some("Rust"), None, "Course overview."),
            hit(None, None, "Orphan text."),
        ]));

        let result = tool.execute(json!({"query": "ownership"})).await.unwrap();
        assert!(result.success);
        assert_eq!(
            result.output,
            "[Rust - Lesson 1]\nOwnership moves values.\n\n[Rust]\nCourse overview.\n\n[unknown]\nOrphan text."
        );
        assert_eq!(
            result.sources,
            vec![
                Source::new("Rust - Lesson 1", Some("https://example.com/Rust/1".into())),
                Source::new("Rust", Some("https://example.com/Rust".into())),
                Source::new("unknown", None),
            ]
        );
    }

    #[tokio::test]
    async fn forwards_filters() {
        let (tool, index) = tool(SearchResults::from_hits(vec![hit(Some("Rust"), Some(2), "x")]));
        tool.execute(json!({"query": "q", "course_name": "Rus", "lesson_number": 2})).await.unwrap();
        let call = index.last_call.lock().unwrap().clone().unwrap();
        assert_eq!(call, ("q".to_string(), Some("Rus".to_string()), Some(2)));
    }

    #[tokio::test]
    async fn empty_results_message_mentions_filters() {
        let (tool, _) = tool(SearchResults::default());
        let plain = tool.execute(json!({"query": "q"})).await.unwrap();
        assert_eq!(plain.output, "No relevant content found.");

        let scoped = tool
            .execute(json!({"query": "q", "course_name": "Rust", "lesson_number": 3}))
            .await
            .unwrap();
        assert_eq!(scoped.output, "No relevant content found in course 'Rust' in lesson 3.");
        assert!(scoped.sources.is_empty());
    }

    #[tokio::test]
    async fn search_error_is_returned_as_output() {
        let (tool, _) = tool(SearchResults::empty_with_error("No course found matching 'Nonexistent'"));
        let result = tool.execute(json!({"query": "q", "course_name": "Nonexistent"})).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.output, "No course found matching 'Nonexistent'");
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn missing_query_is_invalid() {
        let (tool, _) = tool(SearchResults::default());
        let err = tool.execute(json!({"course_name": "Rust"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn bad_lesson_number_is_invalid() {
        let (tool, _) = tool(SearchResults::default());
        let err = tool.execute(json!({"query": "q", "lesson_number": -1})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        let ok = tool.execute(json!({"query": "q", "lesson_number": "4"})).await.unwrap();
        assert!(ok.output.ends_with("in lesson 4."));
    }
}
