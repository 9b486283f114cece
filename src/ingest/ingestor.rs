use std::sync::Arc;

use serde::Serialize;

use super::corpus::PassageRecord;
use crate::core::config::Settings;
use crate::core::errors::ApiError;
use crate::embedding::{EmbeddingProvider, InputType};
use crate::store::{DocumentStore, Page, Passage, VectorIndexDefinition};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub pages: usize,
    pub passages: usize,
    pub embedding_batches: usize,
    pub index: String,
}

/// One-shot corpus load: pages, embedded passages, then the vector index.
pub struct Ingestor {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    index_name: String,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: &Settings,
    ) -> Self {
        Self {
            store,
            embedder,
            batch_size: settings.embedding.batch_size.max(1),
            index_name: settings.database.vector_index.clone(),
        }
    }

    pub async fn run(
        &self,
        pages: Vec<Page>,
        passages: Vec<PassageRecord>,
    ) -> Result<IngestReport, ApiError> {
        let mut report = IngestReport {
            index: self.index_name.clone(),
            ..IngestReport::default()
        };

        report.pages = self.store.insert_pages(pages).await?;
        tracing::info!("Stored {} page(s)", report.pages);

        for batch in passages.chunks(self.batch_size) {
            let bodies: Vec<String> = batch.iter().map(|p| p.body.clone()).collect();
            let vectors = self.embedder.embed(&bodies, InputType::Document).await?;
            if vectors.len() != batch.len() {
                return Err(ApiError::Internal(format!(
                    "Embedding batch returned {} vectors for {} passages",
                    vectors.len(),
                    batch.len()
                )));
            }

            let embedded: Vec<Passage> = batch
                .iter()
                .zip(vectors)
                .map(|(record, embedding)| Passage {
                    metadata: record.metadata.clone(),
                    ..Passage::new(record.body.clone(), embedding)
                })
                .collect();

            report.passages += self.store.insert_passages(embedded).await?;
            report.embedding_batches += 1;
            tracing::info!(
                "Embedded batch {} ({} passages so far)",
                report.embedding_batches,
                report.passages
            );
        }

        self.store
            .create_vector_index(&VectorIndexDefinition::cosine(
                self.index_name.clone(),
                self.embedder.dimensions(),
            ))
            .await?;

        Ok(report)
    }
}
