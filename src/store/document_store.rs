//! DocumentStore trait: the persistence boundary of the agent's tools.
//!
//! Two collections sit behind it: full pages keyed by title, and embedded
//! passages searched through a named vector index.

use async_trait::async_trait;

use super::types::{Page, Passage, ScoredPassage, VectorIndexDefinition, VectorQuery};
use crate::core::errors::ApiError;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append full pages. Titles are not required to be unique.
    async fn insert_pages(&self, pages: Vec<Page>) -> Result<usize, ApiError>;

    /// Append embedded passages.
    async fn insert_passages(&self, passages: Vec<Passage>) -> Result<usize, ApiError>;

    /// Exact, case-sensitive title lookup. The earliest inserted match wins.
    async fn find_page(&self, title: &str) -> Result<Option<Page>, ApiError>;

    /// Similarity search over the passage collection, highest score first.
    async fn vector_search(&self, query: &VectorQuery) -> Result<Vec<ScoredPassage>, ApiError>;

    /// Create or replace a vector index definition.
    async fn create_vector_index(&self, definition: &VectorIndexDefinition) -> Result<(), ApiError>;

    async fn vector_index(&self, name: &str) -> Result<Option<VectorIndexDefinition>, ApiError>;

    async fn count_pages(&self) -> Result<usize, ApiError>;

    async fn count_passages(&self) -> Result<usize, ApiError>;

    /// Release connections. Further calls may fail.
    async fn close(&self);
}

/// Checks shared by every backend before a scan.
pub(crate) fn check_vector_query(
    definition: Option<&VectorIndexDefinition>,
    query: &VectorQuery,
) -> Result<(), ApiError> {
    let Some(definition) = definition else {
        return Err(ApiError::NotFound(format!(
            "Vector index '{}' does not exist",
            query.index
        )));
    };

    if query.limit == 0 {
        return Err(ApiError::BadRequest(
            "Vector search limit must be at least 1".to_string(),
        ));
    }

    if query.limit > query.num_candidates {
        return Err(ApiError::BadRequest(format!(
            "Vector search limit ({}) exceeds num_candidates ({})",
            query.limit, query.num_candidates
        )));
    }

    if query.query_vector.len() != definition.num_dimensions {
        return Err(ApiError::BadRequest(format!(
            "Query vector has {} dimensions, index '{}' expects {}",
            query.query_vector.len(),
            definition.name,
            definition.num_dimensions
        )));
    }

    Ok(())
}

pub(crate) fn check_index_definition(definition: &VectorIndexDefinition) -> Result<(), ApiError> {
    if definition.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Vector index name must not be empty".to_string(),
        ));
    }
    if definition.path != "embedding" {
        return Err(ApiError::BadRequest(format!(
            "Unsupported vector index path '{}'",
            definition.path
        )));
    }
    if definition.num_dimensions == 0 {
        return Err(ApiError::BadRequest(
            "Vector index num_dimensions must be at least 1".to_string(),
        ));
    }
    Ok(())
}
