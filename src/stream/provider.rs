use std::collections::VecDeque;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Value};
use tracing::debug;

use super::StreamError;

/// Ordered stream of generated text fragments.
pub type TokenStream = BoxStream<'static, Result<String, StreamError>>;

/// Upstream token-generation provider.
///
/// `generate` opens exactly one generation request and yields fragments in
/// arrival order. Dropping the returned stream aborts the request.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Whether the credential this provider needs is configured. Checked
    /// before any connection is opened.
    fn has_credential(&self) -> bool;

    async fn generate(&self, prompt: &str) -> Result<TokenStream, StreamError>;
}

/// Provider backed by the Generative Language API's SSE streaming endpoint.
pub struct GeminiProvider {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    pub fn new(model: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_base_url(Self::DEFAULT_BASE_URL, model, api_key)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for GeminiProvider {
    fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn generate(&self, prompt: &str) -> Result<TokenStream, StreamError> {
        let key = match self.api_key.as_deref() {
            Some(k) if !k.is_empty() => k,
            _ => return Err(StreamError::MissingCredential),
        };

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| StreamError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Upstream(format!(
                "generation request failed with status {}",
                status
            )));
        }

        // Incrementally cut `data:` events out of the byte stream and pull
        // the candidate part text from each.
        let bytes = response.bytes_stream().boxed();
        let stream = stream::unfold(
            (bytes, String::new(), VecDeque::new()),
            |(mut bytes, mut buffer, mut pending)| async move {
                loop {
                    if let Some(fragment) = pending.pop_front() {
                        return Some((Ok(fragment), (bytes, buffer, pending)));
                    }

                    match bytes.next().await {
                        Some(Ok(chunk)) => {
                            buffer.push_str(&String::from_utf8_lossy(&chunk));
                            while let Some(pos) = buffer.find("\n\n") {
                                let event: String = buffer.drain(..pos + 2).collect();
                                if let Some(text) = fragment_from_sse_event(&event) {
                                    pending.push_back(text);
                                }
                            }
                        }
                        Some(Err(e)) => {
                            return Some((
                                Err(StreamError::Upstream(e.to_string())),
                                (bytes, buffer, pending),
                            ));
                        }
                        None => return None,
                    }
                }
            },
        );

        Ok(stream.boxed())
    }
}

/// Extract the generated text fragment from one upstream SSE event, if any.
fn fragment_from_sse_event(event: &str) -> Option<String> {
    let data: String = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();

    if data.is_empty() {
        return None;
    }

    let value: Value = serde_json::from_str(&data).ok()?;
    let text = value
        .pointer("/candidates/0/content/parts/0/text")?
        .as_str()?;

    if text.is_empty() {
        debug!("Skipping empty generation fragment");
        return None;
    }

    Some(text.to_string())
}

/// Credential-free provider for local testing: streams a canned reply one
/// word at a time with a short pacing delay.
pub struct CannedProvider {
    reply: String,
}

impl CannedProvider {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl Default for CannedProvider {
    fn default() -> Self {
        Self::new("This is a locally generated reply; no generation credential is configured.")
    }
}

#[async_trait::async_trait]
impl TokenProvider for CannedProvider {
    fn has_credential(&self) -> bool {
        true
    }

    async fn generate(&self, _prompt: &str) -> Result<TokenStream, StreamError> {
        let words: Vec<String> = self
            .reply
            .split_inclusive(' ')
            .map(str::to_string)
            .collect();

        let stream = stream::iter(words).then(|word| async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok::<_, StreamError>(word)
        });

        Ok(stream.boxed())
    }
}
