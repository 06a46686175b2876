//! Relay leg of the audio path: forward a finished artifact to the external
//! agent endpoint and normalize whatever shape it replies with.

mod client;
mod normalize;

pub use client::RelayClient;
pub use normalize::{classify, normalize, RelayReply};

/// Errors from the relay leg. Malformed reply bodies are deliberately not
/// represented here; they degrade to the wrapped/serialized fallback instead.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Transport-level failure reaching the agent endpoint (DNS, refused
    /// connection, timeout).
    #[error("agent endpoint unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The agent endpoint responded outside the success range.
    #[error("agent endpoint returned status {0}")]
    Status(u16),
}
