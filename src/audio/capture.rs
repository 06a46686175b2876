use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::backend::{AudioChunk, CaptureFormat, MicrophoneBackend};
use super::CaptureError;

/// Recording lifecycle states.
///
/// `Stopping` is the window between the stop request and the hardware layer
/// confirming that no further fragments will arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Stopping,
}

/// The finalized, immutable audio blob produced by one completed recording
/// session. Consumed exactly once by the relay client.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub data: Vec<u8>,
    pub mime: String,
}

impl AudioArtifact {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// A zero-length artifact is the no-content case (a session stopped
    /// before any fragment arrived), not a protocol error.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Recording state machine over an injected microphone backend.
///
/// Owns the backend exclusively for each session: `start()` acquires the
/// device, `stop()` releases it on every path, clean or not. At most one
/// session is active at a time; starting while recording is rejected, never
/// queued.
pub struct AudioCapture {
    backend: Box<dyn MicrophoneBackend>,
    state: CaptureState,

    /// Fragments accumulated this session, in arrival order. Written only by
    /// the drain task while recording; read by `stop()` after the drain task
    /// has finished.
    chunks: Arc<Mutex<Vec<AudioChunk>>>,

    /// Whole seconds since `start()`, display only.
    elapsed_secs: Arc<AtomicU64>,

    drain_task: Option<JoinHandle<()>>,
    tick_task: Option<JoinHandle<()>>,
}

impl AudioCapture {
    pub fn new(backend: Box<dyn MicrophoneBackend>) -> Self {
        Self {
            backend,
            state: CaptureState::Idle,
            chunks: Arc::new(Mutex::new(Vec::new())),
            elapsed_secs: Arc::new(AtomicU64::new(0)),
            drain_task: None,
            tick_task: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Seconds elapsed in the current session.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs.load(Ordering::SeqCst)
    }

    /// Start a new recording session.
    ///
    /// Rejects with `SessionActive` when a session is already running and
    /// with `DeviceUnavailable` when the microphone cannot be acquired; in
    /// the latter case the machine stays `Idle` and no artifact will be
    /// emitted for the attempt.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        if self.state != CaptureState::Idle {
            warn!("Start requested while a session is active");
            return Err(CaptureError::SessionActive);
        }

        // Previous session's fragments are gone once a new session starts.
        self.chunks.lock().await.clear();
        self.elapsed_secs.store(0, Ordering::SeqCst);

        let mut rx = self.backend.start().await?;
        self.state = CaptureState::Recording;
        info!("Recording started ({})", self.backend.name());

        let chunks = Arc::clone(&self.chunks);
        self.drain_task = Some(tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                chunks.lock().await.push(chunk);
            }
        }));

        let elapsed = Arc::clone(&self.elapsed_secs);
        self.tick_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.tick().await; // first tick completes immediately
            loop {
                interval.tick().await;
                elapsed.fetch_add(1, Ordering::SeqCst);
            }
        }));

        Ok(())
    }

    /// Stop the current session and finalize the artifact.
    ///
    /// Fails with `NotRecording` unless a session is active. The microphone
    /// handle is released unconditionally before the artifact is assembled;
    /// a release failure is logged, never surfaced as a lost device.
    pub async fn stop(&mut self) -> Result<AudioArtifact, CaptureError> {
        if self.state != CaptureState::Recording {
            return Err(CaptureError::NotRecording);
        }

        self.state = CaptureState::Stopping;

        if let Some(tick) = self.tick_task.take() {
            tick.abort();
        }

        // Release the device. This also closes the fragment channel, so the
        // drain task exits once the final in-flight fragments are consumed.
        if let Err(e) = self.backend.stop().await {
            error!("Microphone release failed: {}", e);
        }

        if let Some(drain) = self.drain_task.take() {
            if let Err(e) = drain.await {
                error!("Fragment drain task panicked: {}", e);
            }
        }

        self.state = CaptureState::Idle;

        let chunks: Vec<AudioChunk> = {
            let mut guard = self.chunks.lock().await;
            std::mem::take(&mut *guard)
        };

        let artifact = finalize_artifact(&chunks, self.backend.format());
        info!(
            "Recording stopped: {} fragments, {} bytes",
            chunks.len(),
            artifact.len()
        );

        Ok(artifact)
    }
}

/// Concatenate fragments in arrival order and wrap them in a WAV container.
///
/// A session with zero fragments yields a zero-length artifact rather than
/// an error; callers treat it as the no-content case.
fn finalize_artifact(chunks: &[AudioChunk], format: CaptureFormat) -> AudioArtifact {
    let mime = "audio/wav".to_string();

    if chunks.is_empty() {
        return AudioArtifact {
            data: Vec::new(),
            mime,
        };
    }

    let pcm: Vec<u8> = chunks.iter().flat_map(|c| c.pcm.iter().copied()).collect();

    match encode_wav(&pcm, format) {
        Ok(data) => AudioArtifact { data, mime },
        Err(e) => {
            // Degraded but never lost: ship the raw PCM bytes instead.
            error!("WAV encoding failed, emitting raw PCM: {}", e);
            AudioArtifact {
                data: pcm,
                mime: "application/octet-stream".to_string(),
            }
        }
    }
}

fn encode_wav(pcm: &[u8], format: CaptureFormat) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for bytes in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([bytes[0], bytes[1]]))?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
