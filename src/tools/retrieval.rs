use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::registry::Tool;
use super::{parse_query_args, query_args_schema};
use crate::core::config::{DatabaseSettings, RetrievalSettings};
use crate::core::errors::ApiError;
use crate::embedding::{EmbeddingProvider, InputType};
use crate::store::{DocumentStore, VectorQuery};

pub const RETRIEVAL_TOOL_NAME: &str = "get_information_for_question_answering";

/// Semantic search over the passage collection.
pub struct RetrievalTool {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: String,
    num_candidates: usize,
    limit: usize,
}

impl RetrievalTool {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        database: &DatabaseSettings,
        retrieval: &RetrievalSettings,
    ) -> Self {
        Self {
            store,
            embedder,
            index: database.vector_index.clone(),
            num_candidates: retrieval.num_candidates,
            limit: retrieval.limit,
        }
    }

    /// Bodies of the closest passages, best first, separated by a blank line.
    pub async fn retrieve(&self, user_query: &str) -> Result<String, ApiError> {
        let user_query = user_query.trim();
        if user_query.is_empty() {
            return Err(ApiError::BadRequest("user_query must not be empty".to_string()));
        }

        if self.store.vector_index(&self.index).await?.is_none() {
            tracing::warn!(
                "Vector index '{}' does not exist; returning no passages",
                self.index
            );
            return Ok(String::new());
        }

        let query_vector = self.embedder.embed_one(user_query, InputType::Query).await?;

        let results = self
            .store
            .vector_search(&VectorQuery {
                index: self.index.clone(),
                query_vector,
                num_candidates: self.num_candidates,
                limit: self.limit,
            })
            .await?;

        tracing::debug!("Retrieved {} passage(s) for question answering", results.len());

        Ok(results
            .into_iter()
            .map(|r| r.body)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[async_trait]
impl Tool for RetrievalTool {
    fn name(&self) -> &str {
        RETRIEVAL_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Retrieve relevant documents for a user query using vector search."
    }

    fn parameters(&self) -> Value {
        query_args_schema()
    }

    async fn invoke(&self, arguments: &Value) -> Result<String, ApiError> {
        let args = parse_query_args(arguments)?;
        self.retrieve(&args.user_query).await
    }
}
