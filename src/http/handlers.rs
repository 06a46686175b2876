use super::state::AppState;
use crate::audio::AudioArtifact;
use crate::stream::StreamError;
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{sse::KeepAlive, IntoResponse, Json, Sse},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

/// Canned transcription returned by the placeholder endpoint until a real
/// speech-to-text service is wired in.
const STUB_TRANSCRIPTION: &str =
    "Hello, this is a simulated transcription of your audio message. \
     I hope you're having a great day!";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Envelope for the relay and stub endpoints:
/// `{ success, response?, text?, reply?, error? }`
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,

    /// Structured agent reply (relay endpoint)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,

    /// Transcribed text (transcription stub)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Canned reply (mock endpoint)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    fn ok() -> Self {
        Self {
            success: true,
            response: None,
            text: None,
            reply: None,
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            text: None,
            reply: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateParams {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MockReplyRequest {
    pub text: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/relay
/// Forward a recorded audio artifact to the external agent endpoint
pub async fn relay_audio(
    State(state): State<AppState>,
    multipart: Multipart,
) -> impl IntoResponse {
    let artifact = match artifact_from_multipart(multipart).await {
        Some(a) => a,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error("No audio file received")),
            )
                .into_response();
        }
    };

    if artifact.is_empty() {
        info!("Relaying zero-length artifact (no captured content)");
    }

    match state.relay.send(&artifact).await {
        Ok(reply) => {
            let mut body = ApiResponse::ok();
            body.response = Some(reply);
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            error!("Relay failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /api/generate/stream?text=...
/// Open an SSE feed of generated text fragments for the given prompt
pub async fn generate_stream(
    State(state): State<AppState>,
    Query(params): Query<GenerateParams>,
) -> impl IntoResponse {
    let text = params.text.unwrap_or_default();

    match state.stream.open(&text) {
        Ok(events) => Sse::new(events).keep_alive(KeepAlive::default()).into_response(),
        Err(StreamError::EmptyPrompt) => {
            (StatusCode::BAD_REQUEST, "No text provided").into_response()
        }
        Err(StreamError::MissingCredential) => {
            warn!("Generation requested without a configured credential");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Generation credential not set",
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to open stream: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// POST /api/transcribe
/// Placeholder transcription endpoint returning fixed text
pub async fn transcribe(multipart: Multipart) -> impl IntoResponse {
    if artifact_from_multipart(multipart).await.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("No audio file received")),
        )
            .into_response();
    }

    let mut body = ApiResponse::ok();
    body.text = Some(STUB_TRANSCRIPTION.to_string());
    (StatusCode::OK, Json(body)).into_response()
}

/// POST /api/mock-reply
/// Canned reply generator for local testing without a live agent
pub async fn mock_reply(Json(req): Json<MockReplyRequest>) -> impl IntoResponse {
    let message = req.text.unwrap_or_default();

    let mut body = ApiResponse::ok();
    body.reply = Some(canned_reply(&message));
    (StatusCode::OK, Json(body)).into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// Helpers
// ============================================================================

/// Pull the single `audio` field out of a multipart body.
///
/// Returns `None` when the field is absent or the body is malformed; the
/// MIME type defaults to the WAV-family type the capture side sends.
async fn artifact_from_multipart(mut multipart: Multipart) -> Option<AudioArtifact> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("audio") {
            continue;
        }

        let mime = field
            .content_type()
            .unwrap_or("audio/wav")
            .to_string();

        match field.bytes().await {
            Ok(bytes) => {
                return Some(AudioArtifact {
                    data: bytes.to_vec(),
                    mime,
                });
            }
            Err(e) => {
                warn!("Failed to read audio field: {}", e);
                return None;
            }
        }
    }

    None
}

/// Keyword-matched canned reply, with a deterministic fallback pool.
fn canned_reply(message: &str) -> String {
    let lower = message.to_lowercase();

    if lower.contains("hello") || lower.contains("hi") {
        return "Hello! How can I assist you today?".to_string();
    }
    if lower.contains("help") {
        return "I'm here to help. What do you need assistance with?".to_string();
    }
    if lower.contains("weather") {
        return "I don't have access to real-time weather data, but I can help with other questions."
            .to_string();
    }
    if lower.contains("audio") || lower.contains("recording") {
        return "I received your audio message. How can I help you with that?".to_string();
    }
    if lower.contains("bye") || lower.contains("goodbye") {
        return "Goodbye! Feel free to chat again if you need anything.".to_string();
    }

    let fallbacks = [
        format!("I understand you're saying: \"{}\". Can you tell me more?", message),
        "Thanks for your message. How else can I assist you?".to_string(),
        "I'm processing your request. Is there anything specific you'd like to know?".to_string(),
        "That's an interesting point. Would you like me to elaborate on anything?".to_string(),
        "I'm here to help with your questions. Is there something specific you're looking for?"
            .to_string(),
    ];

    let index = message.len() % fallbacks.len();
    fallbacks[index].clone()
}
