use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::agent::AgentRun;
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AgentRun>, ApiError> {
    let limit = Duration::from_secs(state.settings.server.request_timeout_secs);

    let run = tokio::time::timeout(limit, state.agent.run(&request.query))
        .await
        .map_err(|_| {
            ApiError::Timeout(format!("Agent run exceeded {}s", limit.as_secs()))
        })??;

    Ok(Json(run))
}
