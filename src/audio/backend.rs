use tokio::sync::mpsc;

use super::CaptureError;

/// A single binary fragment yielded by the hardware layer.
///
/// Fragments are raw 16-bit little-endian PCM, interleaved. They arrive in
/// capture order and are never reordered downstream.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw PCM bytes (i16 LE, interleaved)
    pub pcm: Vec<u8>,
    /// Milliseconds since the recording session started
    pub timestamp_ms: u64,
}

/// PCM format produced by a backend, needed to finalize a WAV artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz mono is the relay convention
            channels: 1,
        }
    }
}

/// Microphone capture backend trait
///
/// Implementations:
/// - cpal: real hardware input device (all platforms)
/// - scripted backends in tests
#[async_trait::async_trait]
pub trait MicrophoneBackend: Send + Sync {
    /// Acquire the device and start capturing.
    ///
    /// Returns a channel receiver that yields fragments in arrival order.
    /// Fails with `CaptureError::DeviceUnavailable` when the hardware handle
    /// cannot be acquired (permission denied, device busy, no device).
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError>;

    /// Stop capturing and release the device handle.
    ///
    /// After this returns, the fragment channel closes once any in-flight
    /// fragments have been delivered; no further fragments will arrive.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Whether the backend currently holds the device.
    fn is_capturing(&self) -> bool;

    /// PCM format of the fragments this backend yields.
    fn format(&self) -> CaptureFormat;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
