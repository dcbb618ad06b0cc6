//! # Lectern Core
//!
//! Domain types, traits, and error definitions for the Lectern course
//! assistant. Every other crate depends inward on this one.
//!
//! ## Design Philosophy
//!
//! Each external collaborator (LLM, embedding model, vector storage, tools)
//! is a trait here. Implementations live in their respective crates, so
//! tests can swap in scripted providers and in-memory stores.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod course;
pub mod index;
pub mod embedding;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, MessageToolCall, Role, SessionId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Reply, ToolDefinition};
pub use tool::{Tool, ToolCall, ToolResult, ToolRegistry, ToolScope};
pub use course::{Course, CourseChunk, Lesson, SearchHit, SearchResults, Source};
pub use index::{Collection, CourseSearch, MetadataFilter, ScoredDocument, StoredDocument, VectorStore};
pub use embedding::Embedder;
pub use event::{DomainEvent, EventBus};
