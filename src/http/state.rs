use crate::relay::RelayClient;
use crate::stream::StreamRelay;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Client for the external agent webhook
    pub relay: Arc<RelayClient>,

    /// SSE bridge to the token-generation provider
    pub stream: Arc<StreamRelay>,
}

impl AppState {
    pub fn new(relay: RelayClient, stream: StreamRelay) -> Self {
        Self {
            relay: Arc::new(relay),
            stream: Arc::new(stream),
        }
    }
}
