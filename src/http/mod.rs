//! HTTP surface of the gateway:
//! - POST /api/relay - forward a recorded artifact to the agent webhook
//! - GET /api/generate/stream - SSE feed of generated text fragments
//! - POST /api/transcribe - placeholder transcription stub
//! - POST /api/mock-reply - canned reply generator for local testing
//! - GET /health - health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
