//! Course document structure: header lines, then lesson sections.
//!
//! ```text
//! Course Title: Building Towards Computer Use
//! Course Link: https://example.com/course
//! Course Instructor: Colt Steele
//!
//! Lesson 0: Introduction
//! Lesson Link: https://example.com/lesson-0
//! Welcome to ...
//! ```

use lectern_core::course::{Course, Lesson};
use lectern_core::error::DocumentError;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Header lines inspected after the title.
const MAX_HEADER_LINES: usize = 3;

/// A course document split into its structural parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub course: Course,
    /// Text before the first lesson marker.
    pub preamble: String,
    /// `(lesson_number, body)` in document order.
    pub lessons: Vec<(u32, String)>,
}

struct Patterns {
    title: Regex,
    course_link: Regex,
    instructor: Regex,
    lesson: Regex,
    lesson_link: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, DocumentError> {
        let compile = |p: &str| {
            Regex::new(p).map_err(|e| DocumentError::Format(format!("invalid pattern {p}: {e}")))
        };
        Ok(Self {
            title: compile(r"(?i)^\s*course\s+title\s*:\s*(.*?)\s*$")?,
            course_link: compile(r"(?i)^\s*course\s+link\s*:\s*(\S+)\s*$")?,
            instructor: compile(r"(?i)^\s*(?:course\s+)?instructor\s*:\s*(.*?)\s*$")?,
            lesson: compile(r"(?i)^\s*lesson\s+(\d+)\s*:\s*(.*?)\s*$")?,
            lesson_link: compile(r"(?i)^\s*lesson\s+link\s*:\s*(\S+)\s*$")?,
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Split raw course text into header metadata, preamble and lesson bodies.
pub fn parse_document(raw: &str) -> Result<ParsedDocument, DocumentError> {
    let patterns = Patterns::compile()?;
    let lines: Vec<&str> = raw.lines().collect();

    let Some(title_at) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return Err(DocumentError::Format("document is empty".into()));
    };
    let first = lines[title_at];
    let title = match patterns.title.captures(first) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).to_string(),
        None => first.trim().to_string(),
    };
    if title.is_empty() {
        return Err(DocumentError::Format("missing course title".into()));
    }

    let mut course = Course::new(title);
    let mut cursor = title_at + 1;
    let mut seen = 0;
    while cursor < lines.len() && seen < MAX_HEADER_LINES {
        let line = lines[cursor];
        if line.trim().is_empty() {
            cursor += 1;
            continue;
        }
        if let Some(caps) = patterns.course_link.captures(line) {
            course.course_link = caps.get(1).and_then(|m| non_empty(m.as_str()));
        } else if let Some(caps) = patterns.instructor.captures(line) {
            course.instructor = caps.get(1).and_then(|m| non_empty(m.as_str()));
        } else {
            break;
        }
        seen += 1;
        cursor += 1;
    }

    let mut preamble = Vec::new();
    let mut lessons: Vec<(u32, Vec<&str>)> = Vec::new();
    let mut numbers = HashSet::new();
    let mut expect_link = false;

    for line in &lines[cursor..] {
        if let Some(caps) = patterns.lesson.captures(line) {
            let digits = caps.get(1).map_or("", |m| m.as_str());
            let number: u32 = digits
                .parse()
                .map_err(|_| DocumentError::Format(format!("lesson number out of range: {digits}")))?;
            if !numbers.insert(number) {
                return Err(DocumentError::Format(format!(
                    "duplicate lesson {number} in '{}'",
                    course.title
                )));
            }
            course.lessons.push(Lesson {
                lesson_number: number,
                title: caps.get(2).map_or("", |m| m.as_str()).to_string(),
                lesson_link: None,
            });
            lessons.push((number, Vec::new()));
            expect_link = true;
            continue;
        }

        if expect_link && !line.trim().is_empty() {
            expect_link = false;
            if let Some(caps) = patterns.lesson_link.captures(line) {
                if let Some(lesson) = course.lessons.last_mut() {
                    lesson.lesson_link = caps.get(1).and_then(|m| non_empty(m.as_str()));
                }
                continue;
            }
        }

        match lessons.last_mut() {
            Some((_, body)) => body.push(line),
            None => preamble.push(*line),
        }
    }

    debug!(course = %course.title, lessons = course.lessons.len(), "Parsed course document");

    Ok(ParsedDocument {
        course,
        preamble: preamble.join("\n"),
        lessons: lessons
            .into_iter()
            .map(|(n, body)| (n, body.join("\n")))
            .collect(),
    })
}
