pub mod audio;
pub mod config;
pub mod http;
pub mod relay;
pub mod stream;
pub mod transcript;

pub use audio::{
    AudioArtifact, AudioCapture, AudioChunk, CaptureError, CaptureFormat, CaptureState,
    CpalMicrophone, MicrophoneBackend,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use relay::{classify, normalize, RelayClient, RelayError, RelayReply};
pub use stream::{
    CannedProvider, GeminiProvider, StreamError, StreamRelay, StreamSession, TokenProvider,
};
pub use transcript::{ChatMessage, JsonFileStore, MemoryStore, Role, TranscriptStore};
