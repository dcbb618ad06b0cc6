//! Turns course documents into a [`Course`] plus tagged chunks.

use crate::chunker::Chunker;
use crate::parser::parse_document;
use lectern_core::course::{Course, CourseChunk};
use lectern_core::error::DocumentError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

/// A parsed document ready for indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedCourse {
    pub course: Course,
    pub chunks: Vec<CourseChunk>,
    pub path: Option<PathBuf>,
}

/// Parse a document and chunk its preamble and lessons.
///
/// Chunk indices run from 0 across the whole course: preamble first, then
/// lessons in document order.
pub fn process_document(raw: &str, config: &ChunkConfig) -> Result<(Course, Vec<CourseChunk>), DocumentError> {
    let parsed = parse_document(raw)?;
    let chunker = Chunker::new(config.chunk_size, config.chunk_overlap);
    let title = parsed.course.title.clone();
    let mut chunks = Vec::new();

    for text in chunker.chunk(&parsed.preamble) {
        chunks.push(CourseChunk {
            content: format!("Course {title} content: {text}"),
            course_title: title.clone(),
            lesson_number: None,
            chunk_index: chunks.len(),
        });
    }

    for (lesson_number, body) in &parsed.lessons {
        for text in chunker.chunk(body) {
            chunks.push(CourseChunk {
                content: format!("Course {title} Lesson {lesson_number} content: {text}"),
                course_title: title.clone(),
                lesson_number: Some(*lesson_number),
                chunk_index: chunks.len(),
            });
        }
    }

    debug!(course = %title, chunks = chunks.len(), "Processed course document");
    Ok((parsed.course, chunks))
}

/// Read a document as UTF-8, replacing invalid sequences.
pub async fn read_document(path: &Path) -> Result<String, DocumentError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| DocumentError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.iter().any(|d| ext.eq_ignore_ascii_case(d)))
}

/// Process every `.txt`/`.md` file in `folder`, sorted by file name.
///
/// Malformed or unreadable files are logged and skipped. When two files
/// carry the same course title, the later one wins. A missing folder yields
/// nothing.
pub async fn process_folder(folder: &Path, config: &ChunkConfig) -> Result<Vec<ProcessedCourse>, DocumentError> {
    if !tokio::fs::try_exists(folder).await.unwrap_or(false) {
        warn!(folder = %folder.display(), "Course folder does not exist");
        return Ok(Vec::new());
    }

    let read_err = |e: std::io::Error| DocumentError::Read {
        path: folder.display().to_string(),
        reason: e.to_string(),
    };
    let mut entries = tokio::fs::read_dir(folder).await.map_err(read_err)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let path = entry.path();
        if path.is_file() && is_document(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut processed: Vec<ProcessedCourse> = Vec::new();
    for path in paths {
        let outcome = match read_document(&path).await {
            Ok(raw) => process_document(&raw, config),
            Err(e) => Err(e),
        };
        let (course, chunks) = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping course document");
                continue;
            }
        };

        let entry = ProcessedCourse { course, chunks, path: Some(path) };
        match processed.iter_mut().find(|p| p.course.title == entry.course.title) {
            Some(existing) => {
                warn!(course = %entry.course.title, "Duplicate course title, keeping the later document");
                *existing = entry;
            }
            None => processed.push(entry),
        }
    }

    info!(folder = %folder.display(), courses = processed.len(), "Processed course folder");
    Ok(processed)
}
