pub mod backend;
pub mod capture;
pub mod device;

pub use backend::{AudioChunk, CaptureFormat, MicrophoneBackend};
pub use capture::{AudioArtifact, AudioCapture, CaptureState};
pub use device::CpalMicrophone;

/// Errors raised by the capture state machine and its backends.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The microphone hardware handle could not be acquired.
    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(String),

    /// Stop requested while no session was recording.
    #[error("no recording in progress")]
    NotRecording,

    /// Start requested while a session was already recording.
    #[error("a recording session is already active")]
    SessionActive,
}
