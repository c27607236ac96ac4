use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use voicestudio_core::error::PreconditionError;
use voicestudio_core::types::ComputeDevice;

use crate::traits::{ModelBackend, VoiceConverter};

/// The single engine instance. The async mutex is the "one call at a time" guard.
pub type SharedConverter = Arc<Mutex<Box<dyn VoiceConverter>>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Error loading model: {0}")]
    Backend(String),

    #[error("model load task failed: {0}")]
    Task(String),
}

#[derive(Clone)]
enum ModelStatus {
    NotStarted,
    Loading,
    Ready {
        device: ComputeDevice,
        converter: SharedConverter,
    },
    Failed(LoadError),
}

impl ModelStatus {
    fn is_terminal(&self) -> bool {
        matches!(self, ModelStatus::Ready { .. } | ModelStatus::Failed(_))
    }
}

impl fmt::Debug for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelStatus::NotStarted => f.write_str("NotStarted"),
            ModelStatus::Loading => f.write_str("Loading"),
            ModelStatus::Ready { device, .. } => write!(f, "Ready({device})"),
            ModelStatus::Failed(e) => write!(f, "Failed({e})"),
        }
    }
}

/// Serializable view of the model lifecycle for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelPhase {
    NotStarted,
    Loading,
    Ready { device: ComputeDevice },
    Failed { message: String },
}

/// Owns the inference engine: one background load attempt, then a readiness gate.
#[derive(Clone)]
pub struct ModelManager {
    backend: Arc<dyn ModelBackend>,
    status: Arc<watch::Sender<ModelStatus>>,
}

impl ModelManager {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        let (status, _) = watch::channel(ModelStatus::NotStarted);
        Self {
            backend,
            status: Arc::new(status),
        }
    }

    /// Kicks off the load in the background. Only the first call does anything; the load
    /// runs to completion even if nobody awaits it. Must be called inside a tokio runtime.
    pub fn start(&self) -> bool {
        let claimed = self.status.send_if_modified(|s| {
            if matches!(s, ModelStatus::NotStarted) {
                *s = ModelStatus::Loading;
                true
            } else {
                false
            }
        });
        if !claimed {
            return false;
        }

        let backend = self.backend.clone();
        let status = self.status.clone();
        tokio::spawn(async move {
            let res = tokio::task::spawn_blocking(move || load_blocking(backend.as_ref()))
                .await
                .map_err(|e| LoadError::Task(e.to_string()))
                .and_then(|r| r);

            let next = match res {
                Ok((device, converter)) => {
                    log::info!("Model loaded successfully on {}", device.label());
                    ModelStatus::Ready {
                        device,
                        converter: Arc::new(Mutex::new(converter)),
                    }
                }
                Err(e) => {
                    log::error!("{e}");
                    ModelStatus::Failed(e)
                }
            };
            status.send_replace(next);
        });
        true
    }

    /// Starts the load if needed and waits for its outcome. Concurrent callers share one attempt;
    /// after a failure every call returns the same error without retrying.
    pub async fn load(&self) -> Result<ComputeDevice, LoadError> {
        self.start();
        self.wait().await
    }

    /// Waits for the outcome of a load that was already started.
    pub async fn wait(&self) -> Result<ComputeDevice, LoadError> {
        let mut rx = self.status.subscribe();
        let status = rx
            .wait_for(ModelStatus::is_terminal)
            .await
            .map_err(|_| LoadError::Task("model manager dropped".into()))?
            .clone();

        match status {
            ModelStatus::Ready { device, .. } => Ok(device),
            ModelStatus::Failed(e) => Err(e),
            ModelStatus::NotStarted | ModelStatus::Loading => {
                Err(LoadError::Task("load did not finish".into()))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.status.borrow(), ModelStatus::Ready { .. })
    }

    pub fn device(&self) -> Option<ComputeDevice> {
        match &*self.status.borrow() {
            ModelStatus::Ready { device, .. } => Some(*device),
            _ => None,
        }
    }

    pub fn phase(&self) -> ModelPhase {
        match &*self.status.borrow() {
            ModelStatus::NotStarted => ModelPhase::NotStarted,
            ModelStatus::Loading => ModelPhase::Loading,
            ModelStatus::Ready { device, .. } => ModelPhase::Ready { device: *device },
            ModelStatus::Failed(e) => ModelPhase::Failed {
                message: e.to_string(),
            },
        }
    }

    /// The engine handle, or the precondition error a conversion should report.
    pub fn converter(&self) -> Result<SharedConverter, PreconditionError> {
        match &*self.status.borrow() {
            ModelStatus::Ready { converter, .. } => Ok(converter.clone()),
            ModelStatus::Failed(e) => Err(PreconditionError::ModelFailed(e.to_string())),
            ModelStatus::NotStarted | ModelStatus::Loading => Err(PreconditionError::ModelNotReady),
        }
    }
}

/// First usable device in probe order. CPU always works.
pub fn select_device(backend: &dyn ModelBackend) -> ComputeDevice {
    ComputeDevice::PROBE_ORDER
        .into_iter()
        .find(|d| *d == ComputeDevice::Cpu || backend.supports(*d))
        .unwrap_or(ComputeDevice::Cpu)
}

fn load_blocking(
    backend: &dyn ModelBackend,
) -> Result<(ComputeDevice, Box<dyn VoiceConverter>), LoadError> {
    let device = select_device(backend);
    log::info!("Loading model on {}...", device.as_str());
    let converter = backend
        .from_pretrained(device)
        .map_err(|e| LoadError::Backend(format!("{e:#}")))?;
    Ok((device, converter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Waveform;
    use std::path::Path;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Silent;

    impl VoiceConverter for Silent {
        fn generate(&mut self, _source: &Path, _target: &Path) -> anyhow::Result<Waveform> {
            Ok(Waveform::mono(vec![0.0; 8], 8_000))
        }
    }

    struct CountingBackend {
        cuda: bool,
        mps: bool,
        fail: bool,
        delay: Duration,
        probes: StdMutex<Vec<ComputeDevice>>,
        loads: AtomicUsize,
    }

    impl CountingBackend {
        fn new(cuda: bool, mps: bool) -> Self {
            Self {
                cuda,
                mps,
                fail: false,
                delay: Duration::ZERO,
                probes: StdMutex::new(Vec::new()),
                loads: AtomicUsize::new(0),
            }
        }
    }

    impl ModelBackend for CountingBackend {
        fn supports(&self, device: ComputeDevice) -> bool {
            self.probes.lock().unwrap().push(device);
            match device {
                ComputeDevice::Cuda => self.cuda,
                ComputeDevice::Mps => self.mps,
                ComputeDevice::Cpu => true,
            }
        }

        fn from_pretrained(&self, _device: ComputeDevice) -> anyhow::Result<Box<dyn VoiceConverter>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            if self.fail {
                anyhow::bail!("weights not found");
            }
            Ok(Box::new(Silent))
        }
    }

    #[test]
    fn device_probe_order() {
        let b = CountingBackend::new(true, true);
        assert_eq!(select_device(&b), ComputeDevice::Cuda);
        assert_eq!(*b.probes.lock().unwrap(), vec![ComputeDevice::Cuda]);

        let b = CountingBackend::new(false, true);
        assert_eq!(select_device(&b), ComputeDevice::Mps);
        assert_eq!(
            *b.probes.lock().unwrap(),
            vec![ComputeDevice::Cuda, ComputeDevice::Mps]
        );

        let b = CountingBackend::new(false, false);
        assert_eq!(select_device(&b), ComputeDevice::Cpu);
        assert_eq!(
            *b.probes.lock().unwrap(),
            vec![ComputeDevice::Cuda, ComputeDevice::Mps]
        );
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_attempt() {
        let mut backend = CountingBackend::new(false, false);
        backend.delay = Duration::from_millis(50);
        let backend = Arc::new(backend);
        let mgr = ModelManager::new(backend.clone());

        assert!(!mgr.is_ready());
        assert_eq!(mgr.converter().err(), Some(PreconditionError::ModelNotReady));

        let (a, b) = tokio::join!(mgr.load(), mgr.load());
        assert_eq!(a.unwrap(), ComputeDevice::Cpu);
        assert_eq!(b.unwrap(), ComputeDevice::Cpu);
        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
        assert!(mgr.is_ready());
        assert_eq!(mgr.phase(), ModelPhase::Ready { device: ComputeDevice::Cpu });
        assert!(mgr.converter().is_ok());

        // Probed once, at load time.
        let probes = backend.probes.lock().unwrap().len();
        mgr.load().await.unwrap();
        assert_eq!(backend.probes.lock().unwrap().len(), probes);
    }

    #[tokio::test]
    async fn failed_load_is_never_retried() {
        let mut backend = CountingBackend::new(false, false);
        backend.fail = true;
        let backend = Arc::new(backend);
        let mgr = ModelManager::new(backend.clone());

        let err = mgr.load().await.unwrap_err();
        assert!(err.to_string().contains("weights not found"));

        let again = mgr.load().await.unwrap_err();
        assert_eq!(err, again);
        assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
        assert!(!mgr.start());
        assert!(matches!(
            mgr.converter().err(),
            Some(PreconditionError::ModelFailed(_))
        ));
    }
}
