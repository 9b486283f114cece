use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let pages = state.store.count_pages().await?;
    let passages = state.store.count_passages().await?;

    Ok(Json(json!({
        "status": "ok",
        "pages": pages,
        "passages": passages,
        "model": state.agent.model_id(),
        "embedding_model": state.embedder.model(),
    })))
}
