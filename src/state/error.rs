use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to open document store: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Failed to initialize embedding provider: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Failed to initialize LLM client: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to register tools: {0}")]
    Tools(#[source] anyhow::Error),

    #[error("Failed to build agent graph: {0}")]
    Graph(#[source] anyhow::Error),
}
