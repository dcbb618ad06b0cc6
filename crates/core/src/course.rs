//! Course domain types.
//!
//! A [`Course`] owns its lessons. Chunks reference their course by title,
//! which is the course's identity across the whole index.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One lesson inside a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_link: Option<String>,
}

/// A course and its ordered lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Unique across the index. Re-ingesting a title replaces the course.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_link: Option<String>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            instructor: None,
            course_link: None,
            lessons: Vec::new(),
        }
    }

    pub fn lesson(&self, lesson_number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.lesson_number == lesson_number)
    }
}

/// A searchable span of course text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseChunk {
    /// Tagged content, e.g. `Course X Lesson 1 content: ...`
    pub content: String,
    pub course_title: String,
    /// `None` for text outside any lesson.
    pub lesson_number: Option<u32>,
    /// Zero-based, contiguous per course.
    pub chunk_index: usize,
}

impl CourseChunk {
    /// Stable identity: `{course_title}_{chunk_index}`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.course_title, self.chunk_index)
    }
}

/// A citation shown next to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub text: String,
    pub link: Option<String>,
}

impl Source {
    pub fn new(text: impl Into<String>, link: Option<String>) -> Self {
        Self { text: text.into(), link }
    }
}

/// One ranked entry from the content collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub metadata: serde_json::Map<String, Value>,
    /// `1 - cosine similarity`; lower is closer.
    pub distance: f32,
}

impl SearchHit {
    pub fn course_title(&self) -> Option<&str> {
        self.metadata.get("course_title").and_then(Value::as_str)
    }

    pub fn lesson_number(&self) -> Option<u32> {
        self.metadata
            .get("lesson_number")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }
}

/// The outcome of a content search.
///
/// Failures are carried in `error` rather than returned as `Err`, so callers
/// must check it before reading `hits`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResults {
    pub fn from_hits(hits: Vec<SearchHit>) -> Self {
        Self { hits, error: None }
    }

    pub fn empty_with_error(error: impl Into<String>) -> Self {
        Self {
            hits: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_combines_title_and_index() {
        let chunk = CourseChunk {
            content: "Course Rust Basics Lesson 1 content: Ownership.".into(),
            course_title: "Rust Basics".into(),
            lesson_number: Some(1),
            chunk_index: 4,
        };
        assert_eq!(chunk.id(), "Rust Basics_4");
    }

    #[test]
    fn lesson_lookup_by_number() {
        let mut course = Course::new("Rust Basics");
        course.lessons.push(Lesson {
            lesson_number: 0,
            title: "Setup".into(),
            lesson_link: None,
        });
        assert_eq!(course.lesson(0).map(|l| l.title.as_str()), Some("Setup"));
        assert!(course.lesson(1).is_none());
    }

    #[test]
    fn hit_metadata_accessors_tolerate_missing_fields() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("course_title".into(), "Rust Basics".into());
        metadata.insert("lesson_number".into(), Value::Null);
        let hit = SearchHit { content: "x".into(), metadata, distance: 0.1 };
        assert_eq!(hit.course_title(), Some("Rust Basics"));
        assert_eq!(hit.lesson_number(), None);
    }

    #[test]
    fn error_results_have_no_hits() {
        let results = SearchResults::empty_with_error("No course found matching 'Nonexistent'");
        assert!(results.is_empty());
        assert!(results.error.as_deref().unwrap().contains("Nonexistent"));
    }
}
