//! Course document ingestion for Lectern.
//!
//! Raw course text goes in; a [`Course`](lectern_core::Course) and its
//! context-tagged [`CourseChunk`](lectern_core::CourseChunk)s come out.

pub mod parser;
pub mod chunker;
pub mod processor;

pub use parser::{parse_document, ParsedDocument};
pub use chunker::Chunker;
pub use processor::{process_document, process_folder, read_document, ChunkConfig, ProcessedCourse};
