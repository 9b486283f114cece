use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InvokeToolRequest {
    #[serde(default)]
    pub arguments: Value,
}

pub async fn list_tools(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "tools": state.tools.catalog() }))
}

pub async fn invoke_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<InvokeToolRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let output = state.tools.invoke_direct(&name, &request.arguments).await?;
    Ok(Json(json!({ "output": output })))
}
