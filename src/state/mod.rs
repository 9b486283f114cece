use std::sync::Arc;

use crate::agent::DocsAgent;
use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::embedding::{EmbeddingProvider, VoyageEmbeddingProvider};
use crate::llm::{ChatModel, OpenAiChatModel};
use crate::store::{DocumentStore, SqliteDocumentStore};
use crate::tools::{build_registry, ToolRegistry};

pub mod error;

use error::InitializationError;

/// Application state shared by the CLI commands and the HTTP routes.
///
/// Every client is built once here and shared by `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<Settings>,
    pub store: Arc<dyn DocumentStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub tools: Arc<ToolRegistry>,
    pub agent: Arc<DocsAgent>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Loading and validating configuration
    /// 2. Opening the SQLite document store
    /// 3. Creating the embedding and chat clients
    /// 4. Registering the tools and building the agent graph
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let store: Arc<dyn DocumentStore> = Arc::new(
            SqliteDocumentStore::new(paths.as_ref(), &settings.database)
                .await
                .map_err(|e| InitializationError::Store(e.into()))?,
        );

        if settings.embedding.api_key.is_none() {
            tracing::warn!("No embedding API key configured (VOYAGE_API_KEY)");
        }
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
            VoyageEmbeddingProvider::new(&settings.embedding)
                .map_err(|e| InitializationError::Embedding(e.into()))?,
        );

        if settings.llm.api_key.is_none() {
            tracing::warn!("No LLM API key configured (OPENAI_API_KEY)");
        }
        let model: Arc<dyn ChatModel> = Arc::new(
            OpenAiChatModel::new(&settings.llm).map_err(|e| InitializationError::Llm(e.into()))?,
        );

        Self::from_parts(paths, config, settings, store, embedder, model)
    }

    /// Assemble the state from already constructed collaborators.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: Settings,
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn ChatModel>,
    ) -> Result<Arc<Self>, InitializationError> {
        let tools = Arc::new(
            build_registry(
                store.clone(),
                embedder.clone(),
                &settings.database,
                &settings.retrieval,
            )
            .map_err(|e| InitializationError::Tools(e.into()))?,
        );

        let agent = Arc::new(
            DocsAgent::new(model, tools.clone(), &settings.app)
                .map_err(|e| InitializationError::Graph(e.into()))?,
        );

        Ok(Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            store,
            embedder,
            tools,
            agent,
        }))
    }

    /// Release the store's connections.
    pub async fn shutdown(&self) {
        self.store.close().await;
    }
}
