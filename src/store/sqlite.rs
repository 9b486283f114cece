//! SQLite-backed document store implementation.
//!
//! In-process store using SQLite for pages, passages and index
//! definitions, with an exact brute-force scan for vector search.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::document_store::{check_index_definition, check_vector_query, DocumentStore};
use super::types::{Page, Passage, ScoredPassage, Similarity, VectorIndexDefinition, VectorQuery};
use super::vector_math::rank_candidates;
use crate::core::config::validation::is_valid_identifier;
use crate::core::config::{AppPaths, DatabaseSettings};
use crate::core::errors::ApiError;

pub struct SqliteDocumentStore {
    pool: SqlitePool,
    db_path: PathBuf,
    pages_table: String,
    passages_table: String,
}

impl SqliteDocumentStore {
    pub async fn new(paths: &AppPaths, settings: &DatabaseSettings) -> Result<Self, ApiError> {
        let db_path = paths.resolve_data_path(&settings.path);
        Self::with_path(db_path, &settings.full_collection, &settings.vs_collection).await
    }

    pub async fn with_path(
        db_path: PathBuf,
        full_collection: &str,
        vs_collection: &str,
    ) -> Result<Self, ApiError> {
        for name in [full_collection, vs_collection] {
            if !is_valid_identifier(name) || name == "vector_indexes" {
                return Err(ApiError::BadRequest(format!(
                    "Invalid collection name '{}'",
                    name
                )));
            }
        }
        if full_collection == vs_collection {
            return Err(ApiError::BadRequest(
                "Page and passage collections must differ".to_string(),
            ));
        }

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(ApiError::internal)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self {
            pool,
            db_path,
            pages_table: full_collection.to_string(),
            passages_table: vs_collection.to_string(),
        };
        store.init_schema().await?;

        tracing::info!(
            "Document store opened at {} ({}, {})",
            store.db_path.display(),
            store.pages_table,
            store.passages_table
        );
        Ok(store)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                metadata TEXT,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
            self.pages_table
        ))
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS \"idx_{0}_title\" ON \"{0}\"(title)",
            self.pages_table
        ))
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                passage_id TEXT NOT NULL UNIQUE,
                body TEXT NOT NULL,
                metadata TEXT,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
            self.passages_table
        ))
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vector_indexes (
                name TEXT PRIMARY KEY,
                path TEXT NOT NULL,
                num_dimensions INTEGER NOT NULL,
                similarity TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn serialize_metadata(metadata: Option<&Value>) -> Result<Option<String>, ApiError> {
        metadata
            .map(|m| serde_json::to_string(m).map_err(ApiError::internal))
            .transpose()
    }

    fn row_to_page(row: &sqlx::sqlite::SqliteRow) -> Page {
        let metadata_str: Option<String> = row.get("metadata");
        Page {
            title: row.get("title"),
            body: row.get("body"),
            metadata: metadata_str.and_then(|raw| serde_json::from_str::<Value>(&raw).ok()),
        }
    }

    fn row_to_index(row: &sqlx::sqlite::SqliteRow) -> Result<VectorIndexDefinition, ApiError> {
        let similarity: String = row.get("similarity");
        let num_dimensions: i64 = row.get("num_dimensions");
        Ok(VectorIndexDefinition {
            name: row.get("name"),
            path: row.get("path"),
            num_dimensions: num_dimensions as usize,
            similarity: Similarity::parse(&similarity).ok_or_else(|| {
                ApiError::Internal(format!("Unknown similarity '{}' in store", similarity))
            })?,
        })
    }

    async fn count_table(&self, table: &str) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", table))
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count as usize)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert_pages(&self, pages: Vec<Page>) -> Result<usize, ApiError> {
        if pages.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "INSERT INTO \"{}\" (title, body, metadata) VALUES (?1, ?2, ?3)",
            self.pages_table
        );
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for page in &pages {
            sqlx::query(&sql)
                .bind(&page.title)
                .bind(&page.body)
                .bind(Self::serialize_metadata(page.metadata.as_ref())?)
                .execute(&mut *tx)
                .await
                .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        tracing::debug!("Inserted {} page(s) into {}", pages.len(), self.pages_table);
        Ok(pages.len())
    }

    async fn insert_passages(&self, passages: Vec<Passage>) -> Result<usize, ApiError> {
        if passages.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "INSERT INTO \"{}\" (passage_id, body, metadata, embedding) VALUES (?1, ?2, ?3, ?4)",
            self.passages_table
        );
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for passage in &passages {
            if passage.embedding.is_empty() {
                return Err(ApiError::BadRequest(format!(
                    "Passage {} has no embedding",
                    passage.passage_id
                )));
            }
            sqlx::query(&sql)
                .bind(&passage.passage_id)
                .bind(&passage.body)
                .bind(Self::serialize_metadata(passage.metadata.as_ref())?)
                .bind(Self::serialize_embedding(&passage.embedding))
                .execute(&mut *tx)
                .await
                .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        tracing::debug!(
            "Inserted {} passage(s) into {}",
            passages.len(),
            self.passages_table
        );
        Ok(passages.len())
    }

    async fn find_page(&self, title: &str) -> Result<Option<Page>, ApiError> {
        let row = sqlx::query(&format!(
            "SELECT title, body, metadata FROM \"{}\" WHERE title = ?1 ORDER BY id ASC LIMIT 1",
            self.pages_table
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(row.as_ref().map(Self::row_to_page))
    }

    async fn vector_search(&self, query: &VectorQuery) -> Result<Vec<ScoredPassage>, ApiError> {
        let definition = self.vector_index(&query.index).await?;
        check_vector_query(definition.as_ref(), query)?;
        let Some(definition) = definition else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(&format!(
            "SELECT body, embedding FROM \"{}\" ORDER BY id ASC",
            self.passages_table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let candidates: Vec<(String, Vec<f32>)> = rows
            .iter()
            .map(|row| {
                let bytes: Vec<u8> = row.get("embedding");
                (row.get::<String, _>("body"), Self::deserialize_embedding(&bytes))
            })
            .collect();

        let skipped = candidates
            .iter()
            .filter(|(_, vector)| vector.len() != definition.num_dimensions)
            .count();
        if skipped > 0 {
            tracing::debug!(
                "Skipped {} passage(s) not matching index '{}' dimensions",
                skipped,
                definition.name
            );
        }

        let results = rank_candidates(
            definition.similarity,
            &query.query_vector,
            candidates
                .iter()
                .map(|(body, vector)| (body.as_str(), vector.as_slice())),
            query.num_candidates,
            query.limit,
        );

        tracing::debug!(
            "Vector search on '{}' scanned {} passage(s), returned {}",
            definition.name,
            candidates.len(),
            results.len()
        );
        Ok(results)
    }

    async fn create_vector_index(&self, definition: &VectorIndexDefinition) -> Result<(), ApiError> {
        check_index_definition(definition)?;

        sqlx::query(
            "INSERT OR REPLACE INTO vector_indexes (name, path, num_dimensions, similarity, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&definition.name)
        .bind(&definition.path)
        .bind(definition.num_dimensions as i64)
        .bind(definition.similarity.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        tracing::info!(
            "Vector index '{}' ready ({} dims, {})",
            definition.name,
            definition.num_dimensions,
            definition.similarity.as_str()
        );
        Ok(())
    }

    async fn vector_index(&self, name: &str) -> Result<Option<VectorIndexDefinition>, ApiError> {
        let row = sqlx::query(
            "SELECT name, path, num_dimensions, similarity FROM vector_indexes WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        row.as_ref().map(Self::row_to_index).transpose()
    }

    async fn count_pages(&self) -> Result<usize, ApiError> {
        self.count_table(&self.pages_table).await
    }

    async fn count_passages(&self) -> Result<usize, ApiError> {
        self.count_table(&self.passages_table).await
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Document store closed");
    }
}
