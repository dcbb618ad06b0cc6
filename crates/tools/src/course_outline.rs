//! Course outline tool: title, link, instructor and lesson list.

use std::sync::Arc;
use async_trait::async_trait;
use lectern_core::course::{Course, Source};
use lectern_core::error::ToolError;
use lectern_core::index::CourseSearch;
use lectern_core::tool::{Tool, ToolResult};
use serde_json::Value;

pub struct CourseOutlineTool {
    index: Arc<dyn CourseSearch>,
}

impl CourseOutlineTool {
    pub fn new(index: Arc<dyn CourseSearch>) -> Self {
        Self { index }
    }
}

fn render_outline(course: &Course) -> String {
    let mut lines = vec![format!("Course: {}", course.title)];
    if let Some(link) = &course.course_link {
        lines.push(format!("Link: {link}"));
    }
    if let Some(instructor) = &course.instructor {
        lines.push(format!("Instructor: {instructor}"));
    }
    if course.lessons.is_empty() {
        lines.push("Lessons: none listed".into());
    } else {
        lines.push(format!("Lessons ({}):", course.lessons.len()));
        for lesson in &course.lessons {
            lines.push(format!("Lesson {}: {}", lesson.lesson_number, lesson.title));
        }
    }
    lines.join("\n")
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn name(&self) -> &str {
        "get_course_outline"
    }

    fn description(&self) -> &str {
        "Get a course's title, link, instructor and complete lesson list"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "course_name": {
                    "type": "string",
                    "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                }
            },
            "required": ["course_name"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let course_name = arguments["course_name"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'course_name' argument".into()))?;

        match self.index.course_outline(course_name).await {
            Ok(Some(course)) => {
                let source = Source::new(course.title.clone(), course.course_link.clone());
                Ok(ToolResult::ok(render_outline(&course)).with_sources(vec![source]))
            }
            Ok(None) => Ok(ToolResult::failed(format!("No course found matching '{course_name}'"))),
            Err(e) => Ok(ToolResult::failed(format!("Search error: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::course::{CourseChunk, Lesson};
    use lectern_index::{CourseIndex, HashingEmbedder, InMemoryStore};
    use serde_json::json;

    async fn seeded_tool() -> CourseOutlineTool {
        let index = CourseIndex::new(Arc::new(InMemoryStore::new()), Arc::new(HashingEmbedder::default()));
        let mut course = Course::new("MCP: Build Rich-Context AI Apps with Anthropic");
        course.course_link = Some("https://example.com/mcp".into());
        course.instructor = Some("Elie Schoppik".into());
        course.lessons = vec![
            Lesson { lesson_number: 0, title: "Introduction".into(), lesson_link: None },
            Lesson { lesson_number: 1, title: "Why MCP".into(), lesson_link: None },
        ];
        index.add_course(&course).await.unwrap();
        index
            .add_chunks(&[CourseChunk {
                content: "Course MCP content: servers and clients.".into(),
                course_title: course.title.clone(),
                lesson_number: None,
                chunk_index: 0,
            }])
            .await
            .unwrap();
        CourseOutlineTool::new(Arc::new(index))
    }

    #[tokio::test]
    async fn outline_lists_lessons_and_cites_course() {
        let tool = seeded_tool().await;
        let result = tool.execute(json!({"course_name": "MCP Build Rich Context"})).await.unwrap();
        assert!(result.success);
        assert!(result.output.starts_with("Course: MCP: Build Rich-Context AI Apps with Anthropic\n"));
        assert!(result.output.contains("Instructor: Elie Schoppik"));
        assert!(result.output.contains("Lesson 0: Introduction\nLesson 1: Why MCP"));
        assert_eq!(result.sources[0].link.as_deref(), Some("https://example.com/mcp"));
    }

    #[tokio::test]
    async fn unknown_course_is_reported() {
        let tool = seeded_tool().await;
        let result = tool.execute(json!({"course_name": "Quantum Gardening"})).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.output, "No course found matching 'Quantum Gardening'");
    }

    #[test]
    fn outline_without_lessons() {
        let text = render_outline(&Course::new("Solo"));
        assert_eq!(text, "Course: Solo\nLessons: none listed");
    }
}
