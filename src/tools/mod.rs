//! Tools the agent can call, and the registry that dispatches them.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::config::{DatabaseSettings, RetrievalSettings};
use crate::core::errors::ApiError;
use crate::embedding::EmbeddingProvider;
use crate::store::DocumentStore;

pub mod lookup;
pub mod registry;
pub mod retrieval;

pub use lookup::{LookupTool, DOCUMENT_NOT_FOUND, LOOKUP_TOOL_NAME};
pub use registry::{Tool, ToolRegistry};
pub use retrieval::{RetrievalTool, RETRIEVAL_TOOL_NAME};

/// Argument object shared by both documentation tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryArgs {
    /// The user's query, or the exact page title for a page lookup.
    pub user_query: String,
}

pub(crate) fn query_args_schema() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(QueryArgs)).unwrap_or_default();
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
    }
    schema
}

pub(crate) fn parse_query_args(arguments: &Value) -> Result<QueryArgs, ApiError> {
    serde_json::from_value(arguments.clone())
        .map_err(|err| ApiError::BadRequest(format!("Invalid tool arguments: {}", err)))
}

/// Registry holding the retrieval and lookup tools, in that order.
pub fn build_registry(
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    database: &DatabaseSettings,
    retrieval: &RetrievalSettings,
) -> Result<ToolRegistry, ApiError> {
    ToolRegistry::with_tools(vec![
        Arc::new(RetrievalTool::new(
            store.clone(),
            embedder,
            database,
            retrieval,
        )),
        Arc::new(LookupTool::new(store)),
    ])
}
