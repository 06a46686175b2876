use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Audio relay to the external agent
        .route("/api/relay", post(handlers::relay_audio))
        // Streamed text generation over SSE
        .route("/api/generate/stream", get(handlers::generate_stream))
        // Local stubs
        .route("/api/transcribe", post(handlers::transcribe))
        .route("/api/mock-reply", post(handlers::mock_reply))
        // Permissive CORS: the SSE feed is consumed cross-origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
