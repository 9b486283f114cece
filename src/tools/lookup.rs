use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::registry::Tool;
use super::{parse_query_args, query_args_schema};
use crate::core::errors::ApiError;
use crate::store::DocumentStore;

pub const LOOKUP_TOOL_NAME: &str = "get_page_content_for_summarization";

/// Returned in place of a body when no page has the requested title.
pub const DOCUMENT_NOT_FOUND: &str = "Document not found";

/// Full-page lookup by exact title.
pub struct LookupTool {
    store: Arc<dyn DocumentStore>,
}

impl LookupTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn lookup(&self, title: &str) -> Result<String, ApiError> {
        match self.store.find_page(title).await? {
            Some(page) => Ok(page.body),
            None => {
                tracing::warn!("No page titled {:?}", title);
                Ok(DOCUMENT_NOT_FOUND.to_string())
            }
        }
    }
}

#[async_trait]
impl Tool for LookupTool {
    fn name(&self) -> &str {
        LOOKUP_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Retrieve the content of a documentation page for summarization."
    }

    fn parameters(&self) -> Value {
        query_args_schema()
    }

    async fn invoke(&self, arguments: &Value) -> Result<String, ApiError> {
        let args = parse_query_args(arguments)?;
        self.lookup(&args.user_query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryDocumentStore, Page};
    use serde_json::json;

    async fn tool() -> LookupTool {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .insert_pages(vec![Page::new(
                "Create a MongoDB Deployment",
                "Deploy a cluster from the Atlas UI.",
            )])
            .await
            .unwrap();
        LookupTool::new(store)
    }

    #[tokio::test]
    async fn returns_body_for_exact_title() {
        let tool = tool().await;
        let args = json!({ "user_query": "Create a MongoDB Deployment" });
        assert_eq!(
            tool.invoke(&args).await.unwrap(),
            "Deploy a cluster from the Atlas UI."
        );
        // Repeated calls give the same answer.
        assert_eq!(
            tool.invoke(&args).await.unwrap(),
            "Deploy a cluster from the Atlas UI."
        );
    }

    #[tokio::test]
    async fn miss_returns_sentinel() {
        let tool = tool().await;
        assert_eq!(tool.lookup("Nonexistent Page").await.unwrap(), DOCUMENT_NOT_FOUND);
        assert_eq!(
            tool.lookup("create a mongodb deployment").await.unwrap(),
            "Document not found"
        );
    }
}
