use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::document_store::{check_index_definition, check_vector_query, DocumentStore};
use super::types::{Page, Passage, ScoredPassage, VectorIndexDefinition, VectorQuery};
use super::vector_math::rank_candidates;
use crate::core::errors::ApiError;

/// Volatile store with the same contract as the SQLite one.
#[derive(Default)]
pub struct MemoryDocumentStore {
    pages: RwLock<Vec<Page>>,
    passages: RwLock<Vec<Passage>>,
    indexes: RwLock<HashMap<String, VectorIndexDefinition>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_pages(&self, pages: Vec<Page>) -> Result<usize, ApiError> {
        let count = pages.len();
        self.pages.write().await.extend(pages);
        Ok(count)
    }

    async fn insert_passages(&self, passages: Vec<Passage>) -> Result<usize, ApiError> {
        if let Some(empty) = passages.iter().find(|p| p.embedding.is_empty()) {
            return Err(ApiError::BadRequest(format!(
                "Passage {} has no embedding",
                empty.passage_id
            )));
        }
        let count = passages.len();
        self.passages.write().await.extend(passages);
        Ok(count)
    }

    async fn find_page(&self, title: &str) -> Result<Option<Page>, ApiError> {
        let pages = self.pages.read().await;
        Ok(pages.iter().find(|page| page.title == title).cloned())
    }

    async fn vector_search(&self, query: &VectorQuery) -> Result<Vec<ScoredPassage>, ApiError> {
        let definition = self.indexes.read().await.get(&query.index).cloned();
        check_vector_query(definition.as_ref(), query)?;
        let Some(definition) = definition else {
            return Ok(Vec::new());
        };

        let passages = self.passages.read().await;
        Ok(rank_candidates(
            definition.similarity,
            &query.query_vector,
            passages
                .iter()
                .map(|p| (p.body.as_str(), p.embedding.as_slice())),
            query.num_candidates,
            query.limit,
        ))
    }

    async fn create_vector_index(&self, definition: &VectorIndexDefinition) -> Result<(), ApiError> {
        check_index_definition(definition)?;
        self.indexes
            .write()
            .await
            .insert(definition.name.clone(), definition.clone());
        Ok(())
    }

    async fn vector_index(&self, name: &str) -> Result<Option<VectorIndexDefinition>, ApiError> {
        Ok(self.indexes.read().await.get(name).cloned())
    }

    async fn count_pages(&self) -> Result<usize, ApiError> {
        Ok(self.pages.read().await.len())
    }

    async fn count_passages(&self) -> Result<usize, ApiError> {
        Ok(self.passages.read().await.len())
    }

    async fn close(&self) {}
}
