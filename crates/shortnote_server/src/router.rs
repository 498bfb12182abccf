use axum::routing::{get, post};
use axum::Router;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all note endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handler::health_handler))
        .route("/api/notes", post(handler::create_handler))
        .route("/api/notes/check", get(handler::check_handler))
        .route("/api/notes/publish", post(handler::publish_handler))
        .route(
            "/api/notes/:id",
            get(handler::get_handler).put(handler::update_handler),
        )
        .with_state(state)
}
