//! Document storage for pages, passages and vector indexes.

pub mod document_store;
pub mod memory;
pub mod sqlite;
pub mod types;
pub mod vector_math;

pub use document_store::DocumentStore;
pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;
pub use types::{Page, Passage, ScoredPassage, Similarity, VectorIndexDefinition, VectorQuery};
