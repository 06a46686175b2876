//! Streaming leg: bridge an upstream token-generation request onto a
//! Server-Sent-Events feed, preserving arrival order.

mod provider;
mod relay;

pub use provider::{CannedProvider, GeminiProvider, TokenProvider, TokenStream};
pub use relay::{SessionState, StreamRelay, StreamSession};

/// Errors from the streaming leg. `EmptyPrompt` and `MissingCredential` are
/// rejected before any upstream connection is opened; `Upstream` covers
/// everything after.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Empty or whitespace-only prompt.
    #[error("no text provided")]
    EmptyPrompt,

    /// The upstream generation credential is not configured.
    #[error("generation credential not configured")]
    MissingCredential,

    /// The upstream provider failed mid-exchange.
    #[error("{0}")]
    Upstream(String),
}
