use crate::{
    handlers, // Import handlers module
    AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Multipart framing on top of the template bytes.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_template_bytes + BODY_LIMIT_SLACK;

    Router::new()
        .route("/templates", get(handlers::list_templates).post(handlers::upload_template))
        .route("/templates/{id}", get(handlers::get_template))
        .route("/memes", get(handlers::list_memes).post(handlers::create_meme))
        .route("/memes/{id}", get(handlers::get_meme))
        .route("/worker", post(handlers::run_worker))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state) // Pass the application state
}
