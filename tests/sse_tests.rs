// Tests for the SSE generation endpoint: ordering, terminal error events,
// and eager rejection without touching the upstream provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex;

use futures::stream;
use futures::StreamExt;
use voice_relay::stream::{StreamError, StreamRelay, TokenProvider, TokenStream};
use voice_relay::{create_router, AppState, RelayClient};

/// Provider that plays back a script and counts generation requests.
struct CountingProvider {
    script: Mutex<Vec<Result<String, String>>>,
    credential: bool,
    calls: Arc<AtomicUsize>,
}

impl CountingProvider {
    fn new(script: Vec<Result<&str, &str>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            credential: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn without_credential() -> Self {
        let mut provider = Self::new(Vec::new());
        provider.credential = false;
        provider
    }
}

#[async_trait::async_trait]
impl TokenProvider for CountingProvider {
    fn has_credential(&self) -> bool {
        self.credential
    }

    async fn generate(&self, _prompt: &str) -> Result<TokenStream, StreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script: Vec<Result<String, StreamError>> = self
            .script
            .lock()
            .unwrap()
            .drain(..)
            .map(|r| r.map_err(StreamError::Upstream))
            .collect();
        Ok(stream::iter(script).boxed())
    }
}

async fn spawn_app(provider: CountingProvider) -> (String, Arc<AtomicUsize>) {
    let calls = Arc::clone(&provider.calls);
    let state = AppState::new(
        RelayClient::new("http://127.0.0.1:9/unused"),
        StreamRelay::new(Arc::new(provider)),
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), calls)
}

/// Data payloads of the SSE events in a raw body, in order.
fn data_events(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter_map(|event| {
            let data: Vec<&str> = event
                .lines()
                .filter_map(|line| line.strip_prefix("data: "))
                .collect();
            if data.is_empty() {
                None
            } else {
                Some(data.join("\n"))
            }
        })
        .collect()
}

#[tokio::test]
async fn test_fragments_forwarded_in_order_then_close() {
    let (base, _) = spawn_app(CountingProvider::new(vec![Ok("Hel"), Ok("lo")])).await;

    let response = reqwest::get(format!("{}/api/generate/stream?text=hi", base))
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    // The script is finite, so the stream closes and the body completes
    let body = response.text().await.unwrap();
    assert_eq!(data_events(&body), vec!["Hel", "lo"]);
}

#[tokio::test]
async fn test_mid_stream_failure_emits_terminal_error_event() {
    let (base, _) = spawn_app(CountingProvider::new(vec![Ok("Hel"), Err("boom")])).await;

    let body = reqwest::get(format!("{}/api/generate/stream?text=hi", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    // One fragment, then exactly one terminal error event, then close
    assert_eq!(data_events(&body), vec!["Hel", "[Error: boom]"]);
}

#[tokio::test]
async fn test_empty_prompt_rejected_without_upstream_call() {
    let (base, calls) = spawn_app(CountingProvider::new(vec![Ok("never")])).await;

    let response = reqwest::get(format!("{}/api/generate/stream?text=%20%20", base))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = reqwest::get(format!("{}/api/generate/stream", base))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_credential_rejected_without_upstream_call() {
    let (base, calls) = spawn_app(CountingProvider::without_credential()).await;

    let response = reqwest::get(format!("{}/api/generate/stream?text=hi", base))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cors_header_is_permissive() {
    let (base, _) = spawn_app(CountingProvider::new(vec![Ok("x")])).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/generate/stream?text=hi", base))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap()),
        Some("*")
    );
}
