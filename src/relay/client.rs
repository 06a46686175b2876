use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::audio::AudioArtifact;

use super::RelayError;

/// Client for the external agent webhook.
///
/// Packages a finished audio artifact as a single-field multipart POST and
/// returns the structured reply. No retries are performed here; retry policy
/// belongs to the caller.
pub struct RelayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one artifact to the agent endpoint.
    ///
    /// Fails with `Unreachable` on transport-level failure and `Status` on a
    /// non-2xx reply. A reply body that is not valid JSON is never an error:
    /// the raw text is wrapped as `{"text": <raw>}`, so this only fails for
    /// transport or status reasons.
    pub async fn send(&self, artifact: &AudioArtifact) -> Result<Value, RelayError> {
        let part = Part::bytes(artifact.data.clone()).file_name("audio.wav");
        let part = match part.mime_str(&artifact.mime) {
            Ok(p) => p,
            Err(_) => {
                warn!("Invalid artifact MIME {:?}, sending untyped", artifact.mime);
                Part::bytes(artifact.data.clone()).file_name("audio.wav")
            }
        };
        let form = Form::new().part("audio", part);

        info!(
            "Relaying {} byte artifact to {}",
            artifact.len(),
            self.endpoint
        );

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(RelayError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(RelayError::Unreachable)?;

        let reply = match serde_json::from_str::<Value>(&body) {
            Ok(value) => value,
            Err(_) => json!({ "text": body }),
        };

        Ok(reply)
    }
}
