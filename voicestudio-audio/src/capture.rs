use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use voicestudio_core::config::CaptureConfig;

#[derive(Debug, thiserror::Error)]
pub enum AudioCaptureError {
    #[error("no input device found")]
    NoInputDevice,

    #[error("failed to list input devices: {0}")]
    ListDevices(#[from] cpal::DevicesError),

    #[error("failed to query supported configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("input device does not support {channels} channel(s) at {sample_rate_hz} Hz")]
    UnsupportedConfig { sample_rate_hz: u32, channels: u16 },

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to play stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("audio worker failed: {0}")]
    Worker(String),

    #[error("audio worker startup timeout")]
    WorkerTimeout,
}

/// Where the capture activity delivers blocks of interleaved f32 samples.
///
/// The stop token is checked once per block: a block is either appended whole or not at all.
#[derive(Clone)]
pub struct BlockSink {
    blocks: Arc<Mutex<Vec<Vec<f32>>>>,
    stop: CancellationToken,
}

impl BlockSink {
    fn new() -> Self {
        Self {
            blocks: Arc::new(Mutex::new(Vec::new())),
            stop: CancellationToken::new(),
        }
    }

    /// Appends one block. Returns `false` once a stop was requested; the block is dropped.
    pub fn push(&self, block: Vec<f32>) -> bool {
        if self.stop.is_cancelled() {
            return false;
        }
        if block.is_empty() {
            return true;
        }
        self.blocks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(block);
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Parks the calling thread until a stop is requested.
    pub fn wait_stopped(&self, poll: Duration) {
        while !self.stop.is_cancelled() {
            std::thread::sleep(poll);
        }
    }

    fn request_stop(&self) {
        self.stop.cancel();
    }

    fn take_blocks(&self) -> Vec<Vec<f32>> {
        std::mem::take(&mut *self.blocks.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

/// An input device driver.
///
/// `run` is called on a dedicated capture thread. It must open the device, call `on_ready`
/// once samples can flow, push every delivered block into `sink`, and return after
/// `sink.is_stopped()` turns true and the device has been torn down.
pub trait CaptureBackend: Send + Sync {
    fn run(
        &self,
        config: &CaptureConfig,
        sink: BlockSink,
        on_ready: &mut dyn FnMut(),
    ) -> Result<(), AudioCaptureError>;
}

/// Everything the capture activity produced, handed over at the join point.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedAudio {
    pub sample_rate_hz: u32,
    pub channels: u16,

    // Interleaved blocks in arrival order.
    pub blocks: Vec<Vec<f32>>,
}

impl CapturedAudio {
    pub fn frame_count(&self) -> usize {
        let channels = usize::from(self.channels.max(1));
        self.blocks.iter().map(|b| b.len() / channels).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate_hz == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / f64::from(self.sample_rate_hz))
    }

    /// Concatenates the blocks along the time axis and splits them into one plane per channel.
    pub fn to_channel_major(&self) -> Vec<Vec<f32>> {
        let channels = usize::from(self.channels.max(1));
        let frames = self.frame_count();
        let mut planes = vec![Vec::with_capacity(frames); channels];
        for block in &self.blocks {
            for frame in block.chunks_exact(channels) {
                for (plane, &s) in planes.iter_mut().zip(frame) {
                    plane.push(s);
                }
            }
        }
        planes
    }
}

const STARTUP_TIMEOUT: Duration = Duration::from_secs(2);

/// One live recording: the capture thread plus the buffer it fills.
pub struct CaptureSession {
    sink: BlockSink,
    worker: Option<JoinHandle<Result<(), AudioCaptureError>>>,
    config: CaptureConfig,
}

impl CaptureSession {
    /// Starts a capture thread with a fresh, empty buffer and waits until the device is streaming.
    pub fn start(
        backend: Arc<dyn CaptureBackend>,
        config: CaptureConfig,
    ) -> Result<Self, AudioCaptureError> {
        let sink = BlockSink::new();
        // Only readiness travels over the channel. A failed open drops the sender and the
        // typed error comes back through `join`.
        let (ready_tx, ready_rx) = mpsc::channel::<()>();

        let worker_sink = sink.clone();
        let worker = std::thread::Builder::new()
            .name("voicestudio-capture".into())
            .spawn(move || {
                let mut signalled = false;
                let res = backend.run(&config, worker_sink, &mut || {
                    if !signalled {
                        signalled = true;
                        let _ = ready_tx.send(());
                    }
                });
                if let Err(e) = &res {
                    log::error!("capture activity failed: {e}");
                }
                res
            })
            .map_err(|e| AudioCaptureError::Worker(format!("spawn capture thread: {e}")))?;

        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(()) => {}
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // The thread exits on its own once it observes the stop request.
                sink.request_stop();
                return Err(AudioCaptureError::WorkerTimeout);
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                sink.request_stop();
                return Err(match worker.join() {
                    Ok(Err(e)) => e,
                    Ok(Ok(())) => AudioCaptureError::Worker(
                        "capture thread exited before the device was ready".into(),
                    ),
                    Err(_) => AudioCaptureError::Worker("capture thread panicked".into()),
                });
            }
        }

        log::info!(
            "capture started: {} Hz, {} channel(s)",
            config.sample_rate_hz,
            config.channels
        );

        Ok(Self {
            sink,
            worker: Some(worker),
            config,
        })
    }

    /// Two-phase stop: signal the capture thread, wait until it has fully quiesced, then
    /// hand over every block it delivered. Blocks the calling thread.
    ///
    /// A capture thread that failed mid-recording still yields what it captured.
    pub fn stop(mut self) -> CapturedAudio {
        self.sink.request_stop();

        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("capture ended with error, keeping captured blocks: {e}"),
                Err(_) => log::error!("capture thread panicked, keeping captured blocks"),
            }
        }

        let captured = CapturedAudio {
            sample_rate_hz: self.config.sample_rate_hz,
            channels: self.config.channels,
            blocks: self.sink.take_blocks(),
        };
        log::info!(
            "capture stopped: {} block(s), {} frame(s)",
            captured.blocks.len(),
            captured.frame_count()
        );
        captured
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        // Dropped without `stop` (e.g. shutdown): let the thread wind down on its own.
        self.sink.request_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Delivers `blocks` blocks of `frames` frames, then idles until stopped.
    struct ScriptedBackend {
        blocks: usize,
        frames: usize,
        fail_to_open: bool,
    }

    impl CaptureBackend for ScriptedBackend {
        fn run(
            &self,
            config: &CaptureConfig,
            sink: BlockSink,
            on_ready: &mut dyn FnMut(),
        ) -> Result<(), AudioCaptureError> {
            if self.fail_to_open {
                return Err(AudioCaptureError::NoInputDevice);
            }
            let channels = usize::from(config.channels);
            for i in 0..self.blocks {
                let block = vec![i as f32; self.frames * channels];
                if !sink.push(block) {
                    break;
                }
            }
            // Report ready only after the script ran so the test is deterministic.
            on_ready();
            sink.wait_stopped(Duration::from_millis(1));
            Ok(())
        }
    }

    fn cfg() -> CaptureConfig {
        CaptureConfig {
            sample_rate_hz: 1_000,
            channels: 2,
            block_frames: 10,
        }
    }

    #[test]
    fn collects_blocks_until_stopped() {
        let backend = Arc::new(ScriptedBackend {
            blocks: 4,
            frames: 10,
            fail_to_open: false,
        });
        let session = CaptureSession::start(backend, cfg()).unwrap();
        let captured = session.stop();

        assert_eq!(captured.blocks.len(), 4);
        assert_eq!(captured.frame_count(), 40);
        assert_eq!(captured.channels, 2);
        assert_eq!(captured.duration(), Duration::from_millis(40));
    }

    #[test]
    fn open_failure_is_reported() {
        let backend = Arc::new(ScriptedBackend {
            blocks: 0,
            frames: 0,
            fail_to_open: true,
        });
        let err = CaptureSession::start(backend, cfg()).err().unwrap();
        assert!(matches!(err, AudioCaptureError::NoInputDevice), "{err:?}");
    }

    #[test]
    fn push_after_stop_is_rejected() {
        let sink = BlockSink::new();
        assert!(sink.push(vec![0.0; 4]));
        sink.request_stop();
        assert!(!sink.push(vec![0.0; 4]));
        assert_eq!(sink.take_blocks().len(), 1);
    }

    #[test]
    fn channel_major_transposes_interleaved_blocks() {
        let captured = CapturedAudio {
            sample_rate_hz: 10,
            channels: 2,
            blocks: vec![vec![1.0, -1.0, 2.0, -2.0], vec![3.0, -3.0]],
        };
        let planes = captured.to_channel_major();
        assert_eq!(planes, vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0]]);
    }
}
