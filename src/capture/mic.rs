//! Microphone capture
//!
//! `MicSource` is the seam between the capture controller and the hardware;
//! `CpalMicSource` implements it with a dedicated thread that owns the cpal
//! input stream (cpal streams are not `Send`) and assembles fixed-interval
//! binary chunks inside the audio callback.

use crate::config::CaptureSettings;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// Microphone stream source. One capture session at a time; the device is
/// held only between a successful `start` and the matching `stop`.
#[async_trait]
pub trait MicSource: Send + Sync {
    /// Acquire the device and begin emitting fixed-interval binary chunks.
    ///
    /// The receiver closes when capture stops. Fails if the device cannot
    /// be acquired or capture is already running.
    async fn start(&self) -> Result<mpsc::Receiver<Vec<u8>>>;

    /// Release the device. Safe to call repeatedly; releasing an already
    /// stopped source is a no-op.
    fn stop(&self);

    fn is_capturing(&self) -> bool;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Default-host cpal microphone.
pub struct CpalMicSource {
    settings: CaptureSettings,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalMicSource {
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            settings,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }
}

#[async_trait]
impl MicSource for CpalMicSource {
    async fn start(&self) -> Result<mpsc::Receiver<Vec<u8>>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(anyhow!("microphone capture already running"));
        }

        // Reap a previous worker; it exits promptly once `running` clears.
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(handle) = worker.take() {
                let _ = handle.join();
            }
        }

        let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<u8>>(64);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let settings = self.settings.clone();
        let running = Arc::clone(&self.running);

        let handle = thread::spawn(move || {
            capture_thread(settings, running, chunk_tx, ready_tx);
        });

        let outcome = ready_rx
            .await
            .unwrap_or_else(|_| Err(anyhow!("capture thread exited during setup")));

        match outcome {
            Ok(()) => {
                if let Ok(mut worker) = self.worker.lock() {
                    *worker = Some(handle);
                }
                Ok(chunk_rx)
            }
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(err)
            }
        }
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("microphone released");
        }
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal-default-input"
    }
}

fn capture_thread(
    settings: CaptureSettings,
    running: Arc<AtomicBool>,
    chunks: mpsc::Sender<Vec<u8>>,
    ready: oneshot::Sender<Result<()>>,
) {
    let setup = || -> Result<cpal::Stream> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("no default input device available")?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        // The DSP flags are OS-level device hints; cpal exposes no knobs
        // for them, so they are surfaced in the log only.
        info!(
            device = %device_name,
            sample_rate = settings.sample_rate,
            channels = settings.channels,
            echo_cancellation = settings.echo_cancellation,
            noise_suppression = settings.noise_suppression,
            auto_gain = settings.auto_gain,
            "acquiring microphone"
        );

        let config = StreamConfig {
            channels: settings.channels,
            sample_rate: SampleRate(settings.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let chunk_bytes = (settings.sample_rate as usize * settings.channels as usize * 2)
            * settings.chunk_interval_ms as usize
            / 1000;
        let chunk_bytes = chunk_bytes.max(2);

        let running_cb = Arc::clone(&running);
        let mut pending: Vec<u8> = Vec::with_capacity(chunk_bytes * 2);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !running_cb.load(Ordering::Relaxed) {
                        return;
                    }
                    for &sample in data {
                        let s = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                        pending.extend_from_slice(&s.to_le_bytes());
                    }
                    while pending.len() >= chunk_bytes {
                        let chunk: Vec<u8> = pending.drain(..chunk_bytes).collect();
                        if chunks.try_send(chunk).is_err() {
                            // Receiver is slow or gone; realtime audio is
                            // dropped rather than queued.
                            return;
                        }
                    }
                },
                |err| {
                    error!(error = %err, "microphone stream error");
                },
                None,
            )
            .context("failed to build input stream")?;

        stream.play().context("failed to start input stream")?;
        Ok(stream)
    };

    match setup() {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            while running.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(50));
            }
            drop(stream);
        }
        Err(err) => {
            warn!(error = %err, "microphone acquisition failed");
            let _ = ready.send(Err(err));
        }
    }
}
