use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::core::config::EmbeddingSettings;
use crate::core::errors::ApiError;
use super::provider::{EmbeddingProvider, InputType};

/// Hosted embedding client speaking the Voyage AI `/v1/embeddings` API.
#[derive(Clone)]
pub struct VoyageEmbeddingProvider {
    base_url: String,
    model: String,
    dimensions: usize,
    api_key: Option<String>,
    client: Client,
}

impl VoyageEmbeddingProvider {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            api_key: settings.api_key.clone(),
            client,
        })
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

#[async_trait]
impl EmbeddingProvider for VoyageEmbeddingProvider {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, inputs: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "input": inputs,
            "model": self.model,
            "input_type": input_type.as_str(),
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Embedding request failed ({}): {}",
                status, text
            )));
        }

        let payload: EmbeddingResponse = res.json().await.map_err(ApiError::internal)?;
        let vectors = order_embeddings(payload, inputs.len(), self.dimensions)?;

        tracing::debug!(
            "Embedded {} input(s) with {} ({})",
            vectors.len(),
            self.model,
            input_type.as_str()
        );

        Ok(vectors)
    }
}

/// Put vectors back in input order and check count and dimensionality.
fn order_embeddings(
    payload: EmbeddingResponse,
    expected: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>, ApiError> {
    if payload.data.len() != expected {
        return Err(ApiError::Internal(format!(
            "Embedding count mismatch: sent {}, received {}",
            expected,
            payload.data.len()
        )));
    }

    let mut items: Vec<(usize, Vec<f32>)> = payload
        .data
        .into_iter()
        .enumerate()
        .map(|(position, item)| (item.index.unwrap_or(position), item.embedding))
        .collect();
    items.sort_by_key(|(index, _)| *index);

    let mut vectors = Vec::with_capacity(items.len());
    for (index, vector) in items {
        if vector.len() != dimensions {
            return Err(ApiError::Internal(format!(
                "Embedding {} has {} dimensions, expected {}",
                index,
                vector.len(),
                dimensions
            )));
        }
        vectors.push(vector);
    }

    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: serde_json::Value) -> EmbeddingResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn vectors_are_reordered_by_index() {
        let response = payload(json!({
            "data": [
                { "embedding": [0.0, 1.0], "index": 1 },
                { "embedding": [1.0, 0.0], "index": 0 }
            ],
            "model": "voyage-3-lite"
        }));

        let vectors = order_embeddings(response, 2, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let response = payload(json!({ "data": [{ "embedding": [1.0, 0.0, 0.0], "index": 0 }] }));
        let err = order_embeddings(response, 1, 512).unwrap_err();
        assert!(err.to_string().contains("expected 512"));
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let response = payload(json!({ "data": [] }));
        assert!(order_embeddings(response, 1, 2).is_err());
    }

    #[test]
    fn input_type_wire_names() {
        assert_eq!(InputType::Document.as_str(), "document");
        assert_eq!(InputType::Query.as_str(), "query");
    }
}
