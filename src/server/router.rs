use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{ask, health, tools};
use crate::state::AppState;

/// Creates the application router.
///
/// Routes:
/// - `GET /health`
/// - `GET /api/tools`, `POST /api/tools/:name`
/// - `POST /api/ask`
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/tools", get(tools::list_tools))
        .route("/api/tools/:name", post(tools::invoke_tool))
        .route("/api/ask", post(ask::ask))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
