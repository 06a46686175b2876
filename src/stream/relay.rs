use std::convert::Infallible;
use std::sync::Arc;

use axum::response::sse::Event;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

use super::provider::TokenProvider;
use super::StreamError;

/// Fragments in flight between the upstream pull and the SSE body. Kept
/// small so a slow downstream consumer throttles the upstream read instead
/// of buffering it in memory.
const FORWARD_CHANNEL_DEPTH: usize = 8;

/// Lifecycle of one SSE connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closing,
    Closed,
}

/// One downstream SSE connection and its single upstream generation request.
#[derive(Debug)]
pub struct StreamSession {
    pub id: Uuid,
    pub state: SessionState,
}

impl StreamSession {
    fn open() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Open,
        }
    }
}

/// Bridges an upstream token-generation stream onto an SSE feed.
///
/// Fragments are republished in the exact order received, one `data:` event
/// each. A mid-stream failure becomes exactly one terminal `[Error: …]`
/// event followed by a clean close, so the downstream client never sees a
/// bare disconnect.
pub struct StreamRelay {
    provider: Arc<dyn TokenProvider>,
}

impl StreamRelay {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self { provider }
    }

    /// Open a relay for one prompt.
    ///
    /// Rejects empty/whitespace prompts and a missing credential eagerly,
    /// before any upstream connection is opened. Everything after that is
    /// reported in-stream. Dropping the returned stream (downstream
    /// disconnect) tears the forward task and its upstream request down.
    pub fn open(
        &self,
        prompt: &str,
    ) -> Result<impl futures::Stream<Item = Result<Event, Infallible>>, StreamError> {
        if prompt.trim().is_empty() {
            return Err(StreamError::EmptyPrompt);
        }
        if !self.provider.has_credential() {
            return Err(StreamError::MissingCredential);
        }

        let mut session = StreamSession::open();
        info!("Stream session {} opened", session.id);

        let (tx, rx) = mpsc::channel::<Event>(FORWARD_CHANNEL_DEPTH);
        let provider = Arc::clone(&self.provider);
        let prompt = prompt.to_string();

        tokio::spawn(async move {
            let mut upstream = match provider.generate(&prompt).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Stream session {} failed to open upstream: {}", session.id, e);
                    let _ = tx.send(error_event(&e)).await;
                    return;
                }
            };

            while let Some(item) = upstream.next().await {
                match item {
                    Ok(fragment) => {
                        if tx.send(Event::default().data(fragment)).await.is_err() {
                            // Downstream went away; dropping `upstream` here
                            // aborts the generation request.
                            session.state = SessionState::Closed;
                            info!("Stream session {} client disconnected", session.id);
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Stream session {} upstream error: {}", session.id, e);
                        session.state = SessionState::Closing;
                        let _ = tx.send(error_event(&e)).await;
                        session.state = SessionState::Closed;
                        return;
                    }
                }
            }

            // Natural end of generation: dropping the sender closes the SSE
            // body with no trailing sentinel.
            session.state = SessionState::Closed;
            info!("Stream session {} completed", session.id);
        });

        Ok(ReceiverStream::new(rx).map(Ok))
    }
}

fn error_event(err: &StreamError) -> Event {
    Event::default().data(format!("[Error: {}]", err))
}
