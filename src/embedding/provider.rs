use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// Which side of an asymmetric embedding the text is on.
///
/// Passages are embedded as `Document` at ingestion time, questions as
/// `Query` at retrieval time. Mixing the two degrades recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Document,
    Query,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Document => "document",
            InputType::Query => "query",
        }
    }
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// return the model identifier (e.g. "voyage-3-lite")
    fn model(&self) -> &str;

    /// fixed length of every vector this provider returns
    fn dimensions(&self) -> usize;

    /// embed a batch of texts, one vector per input in input order
    async fn embed(&self, inputs: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>, ApiError>;

    /// embed a single text
    async fn embed_one(&self, input: &str, input_type: InputType) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.embed(&[input.to_string()], input_type).await?;
        if vectors.len() != 1 {
            return Err(ApiError::Internal(format!(
                "Expected 1 embedding, provider returned {}",
                vectors.len()
            )));
        }
        Ok(vectors.remove(0))
    }
}
