use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use super::backend::{AudioChunk, CaptureFormat, MicrophoneBackend};
use super::CaptureError;

/// Channel depth for fragments in flight between the device thread and the
/// capture drain task. ~25s of audio at 100ms fragments.
const CHUNK_CHANNEL_DEPTH: usize = 256;

/// Microphone backend backed by the default cpal input device.
///
/// cpal streams are not `Send`, so the stream lives on a dedicated thread for
/// the duration of the session. `stop()` signals that thread, which drops the
/// stream (releasing the device) and closes the fragment channel.
pub struct CpalMicrophone {
    format: CaptureFormat,
    shutdown: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl CpalMicrophone {
    pub fn new(format: CaptureFormat) -> Self {
        Self {
            format,
            shutdown: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl MicrophoneBackend for CpalMicrophone {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::DeviceUnavailable(
                "device already held by an active session".to_string(),
            ));
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_CHANNEL_DEPTH);
        let (ready_tx, ready_rx) = oneshot::channel();

        let shutdown = Arc::new(AtomicBool::new(false));
        self.shutdown = Arc::clone(&shutdown);
        let format = self.format;

        let worker = std::thread::spawn(move || {
            run_device_thread(format, chunk_tx, shutdown, ready_tx);
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.worker = Some(worker);
                info!("Microphone stream opened");
                Ok(chunk_rx)
            }
            Ok(Err(e)) => {
                // Thread reported the failure and is already exiting.
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(CaptureError::DeviceUnavailable(
                    "capture thread exited before the stream opened".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.shutdown.store(true, Ordering::SeqCst);

        if let Some(worker) = self.worker.take() {
            // Join off the async runtime; the thread exits within one poll tick.
            let joined = tokio::task::spawn_blocking(move || worker.join()).await;
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(_)) => error!("Microphone device thread panicked"),
                Err(e) => error!("Failed to join device thread: {}", e),
            }
        }

        info!("Microphone released");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn format(&self) -> CaptureFormat {
        self.format
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

/// Owns the cpal stream for one session.
///
/// Reports acquisition success/failure through `ready_tx`, then parks until
/// the shutdown flag is set. Dropping the stream at the end of this function
/// is what releases the hardware handle.
fn run_device_thread(
    format: CaptureFormat,
    chunk_tx: mpsc::Sender<AudioChunk>,
    shutdown: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(d) => d,
        None => {
            let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(
                "no input device available".to_string(),
            )));
            return;
        }
    };

    let device_config = match device.default_input_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(format!(
                "failed to query input config: {}",
                e
            ))));
            return;
        }
    };

    let source_rate = device_config.sample_rate().0;
    let source_channels = device_config.channels();
    let stream_config: cpal::StreamConfig = device_config.config();

    let started_at = Instant::now();
    let callback_shutdown = Arc::clone(&shutdown);

    let data_callback = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        // Checked before sending: once stop() flips the flag, no further
        // fragment leaves the callback even if cpal fires one more time.
        if callback_shutdown.load(Ordering::SeqCst) {
            return;
        }

        let samples: Vec<i16> = data
            .iter()
            .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect();

        let processed = process_samples(samples, source_rate, source_channels, format);
        if processed.is_empty() {
            return;
        }

        let pcm: Vec<u8> = processed.iter().flat_map(|s| s.to_le_bytes()).collect();
        let chunk = AudioChunk {
            pcm,
            timestamp_ms: started_at.elapsed().as_millis() as u64,
        };

        // A send failure means the receiver is gone and the session is over;
        // the stop flag will arrive shortly.
        let _ = chunk_tx.blocking_send(chunk);
    };

    let stream = match device.build_input_stream(
        &stream_config,
        data_callback,
        |err| error!("Audio stream error: {}", err),
        None,
    ) {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(format!(
                "failed to build input stream: {}",
                e
            ))));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(format!(
            "failed to start input stream: {}",
            e
        ))));
        return;
    }

    if ready_tx.send(Ok(())).is_err() {
        // start() gave up; drop the stream and bail.
        return;
    }

    while !shutdown.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(20));
    }

    // Stream drops here: device handle released, fragment channel closes.
}

/// Convert device-format samples to the target capture format.
fn process_samples(
    samples: Vec<i16>,
    source_rate: u32,
    source_channels: u16,
    target: CaptureFormat,
) -> Vec<i16> {
    let mono = if source_channels == 2 && target.channels == 1 {
        stereo_to_mono(&samples)
    } else {
        samples
    };

    downsample(&mono, source_rate, target.sample_rate)
}

/// Sum stereo pairs into mono, clamped to i16 range.
fn stereo_to_mono(samples: &[i16]) -> Vec<i16> {
    samples
        .chunks_exact(2)
        .map(|pair| {
            let sum = pair[0] as i32 + pair[1] as i32;
            sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16
        })
        .collect()
}

/// Downsample by decimation: take every Nth sample. Upsampling is not
/// supported; the input is passed through unchanged.
fn downsample(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<i16> {
    if source_rate <= target_rate || target_rate == 0 {
        return samples.to_vec();
    }

    let ratio = (source_rate / target_rate) as usize;
    if ratio <= 1 {
        return samples.to_vec();
    }

    samples.iter().step_by(ratio).copied().collect()
}
