pub mod ask;
pub mod health;
pub mod tools;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::response::IntoResponse;
    use axum::Json;
    use serde_json::json;

    use super::ask::{ask, AskRequest};
    use super::health::health;
    use super::tools::{invoke_tool, list_tools, InvokeToolRequest};
    use crate::core::config::{AppPaths, ConfigService, Settings};
    use crate::core::errors::ApiError;
    use crate::llm::{Message, ToolCall};
    use crate::state::AppState;
    use crate::store::{DocumentStore, MemoryDocumentStore, Page};
    use crate::test_support::{FixedEmbedder, ScriptedModel};
    use crate::tools::LOOKUP_TOOL_NAME;

    async fn state(replies: Vec<Message>, tmp: &tempfile::TempDir) -> Arc<AppState> {
        let paths = Arc::new(AppPaths::with_dirs(
            tmp.path().to_path_buf(),
            tmp.path().join("data"),
        ));
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .insert_pages(vec![Page::new("Create a MongoDB Deployment", "Deploy it.")])
            .await
            .unwrap();

        AppState::from_parts(
            paths.clone(),
            ConfigService::new(paths),
            Settings::default(),
            store,
            Arc::new(FixedEmbedder::new(vec![1.0, 0.0])),
            Arc::new(ScriptedModel::new(replies)),
        )
        .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(Vec::new(), &tmp).await;

        let response = health(State(state)).await.unwrap().into_response();
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["pages"], 1);
        assert_eq!(body["passages"], 0);
    }

    #[tokio::test]
    async fn ask_runs_the_agent() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(
            vec![
                Message::assistant_with_tool_calls(
                    "",
                    vec![ToolCall::new(
                        "call_1",
                        LOOKUP_TOOL_NAME,
                        json!({ "user_query": "Create a MongoDB Deployment" }),
                    )],
                ),
                Message::assistant("It explains deployment."),
            ],
            &tmp,
        )
        .await;

        let Json(run) = ask(
            State(state),
            Json(AskRequest {
                query: "Give me a summary of the page titled Create a MongoDB Deployment"
                    .to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(run.answer, "It explains deployment.");
        assert!(run.finished);
        assert_eq!(run.messages.len(), 4);
    }

    #[tokio::test]
    async fn ask_rejects_empty_query() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(Vec::new(), &tmp).await;
        let result = ask(State(state), Json(AskRequest { query: " ".to_string() })).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn tools_can_be_listed_and_invoked() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(Vec::new(), &tmp).await;

        let body = body_json(list_tools(State(state.clone())).await.into_response()).await;
        assert_eq!(body["tools"].as_array().unwrap().len(), 2);

        let response = invoke_tool(
            State(state.clone()),
            Path(LOOKUP_TOOL_NAME.to_string()),
            Json(InvokeToolRequest {
                arguments: json!({ "user_query": "Nonexistent Page" }),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(body_json(response).await["output"], "Document not found");

        let missing = invoke_tool(
            State(state),
            Path("nope".to_string()),
            Json(InvokeToolRequest {
                arguments: json!({}),
            }),
        )
        .await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }
}
