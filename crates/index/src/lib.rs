//! Vector index implementations for Lectern.
//!
//! Two collections share one embedder: the course catalog (resolves loose
//! course names) and the chunk content (answers questions).

pub mod vector;
pub mod hashing;
pub mod provider_embedder;
pub mod in_memory;
pub mod course_index;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "local-embeddings")]
pub mod local;

pub use vector::{cosine_similarity, rank_by_similarity};
pub use hashing::HashingEmbedder;
pub use provider_embedder::ProviderEmbedder;
pub use in_memory::InMemoryStore;
pub use course_index::CourseIndex;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "local-embeddings")]
pub use local::{LocalEmbedder, DEFAULT_LOCAL_MODEL};
