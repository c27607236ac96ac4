use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use voicestudio_audio::{AudioOutput, CaptureBackend};
use voicestudio_core::config::StudioConfig;
use voicestudio_core::error::{StudioError, StudioResult};
use voicestudio_core::gallery::GallerySummary;
use voicestudio_core::types::{AudioKind, ComputeDevice, TargetIdentity};
use voicestudio_engine::convert::{ConversionOrchestrator, ConvertedAudio};
use voicestudio_engine::model::{LoadError, ModelManager};
use voicestudio_runtime::ipc::SessionStatus;

use crate::session::{SessionActor, SessionCmd};

/// Handle to a running studio session. Cheap to clone; every clone talks to the same session.
///
/// Operations are serialized by the session task, so callers never observe a half-applied
/// state change.
#[derive(Clone)]
pub struct StudioService {
    tx: mpsc::Sender<SessionCmd>,
    model: ModelManager,
    config: Arc<StudioConfig>,
}

impl StudioService {
    /// Scans the gallery and starts the session task. Must be called inside a tokio runtime.
    ///
    /// The model is not loaded here; call [`StudioService::start_model_load`].
    pub fn spawn(
        config: StudioConfig,
        capture: Arc<dyn CaptureBackend>,
        output: Box<dyn AudioOutput>,
        model: ModelManager,
    ) -> Self {
        let orchestrator = ConversionOrchestrator::new(model.clone(), &config.converted_dir);
        let tx = SessionActor::spawn(config.clone(), capture, output, orchestrator);
        Self {
            tx,
            model,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCmd,
    ) -> StudioResult<T> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(make(tx))
            .await
            .map_err(|_| StudioError::SessionClosed)?;
        rx.await.map_err(|_| StudioError::SessionClosed)
    }

    pub async fn targets(&self) -> StudioResult<Vec<TargetIdentity>> {
        self.request(|respond_to| SessionCmd::Targets { respond_to })
            .await
    }

    pub async fn gallery_summary(&self) -> StudioResult<GallerySummary> {
        self.request(|respond_to| SessionCmd::Summary { respond_to })
            .await
    }

    pub async fn rescan_gallery(&self) -> StudioResult<GallerySummary> {
        self.request(|respond_to| SessionCmd::RescanGallery { respond_to })
            .await
    }

    /// Selects a target by gallery key or display name.
    pub async fn select_target(&self, needle: &str) -> StudioResult<TargetIdentity> {
        let needle = needle.to_string();
        self.request(|respond_to| SessionCmd::SelectTarget { needle, respond_to })
            .await?
    }

    pub async fn start_recording(&self) -> StudioResult<()> {
        self.request(|respond_to| SessionCmd::StartRecording { respond_to })
            .await?
    }

    /// Stops capturing and saves the recording. Returns once the capture thread has exited
    /// and the file is on disk.
    pub async fn stop_recording(&self) -> StudioResult<PathBuf> {
        self.request(|respond_to| SessionCmd::StopRecording { respond_to })
            .await?
    }

    pub async fn load_source_file(&self, path: impl Into<PathBuf>) -> StudioResult<PathBuf> {
        let path = path.into();
        self.request(|respond_to| SessionCmd::LoadSourceFile { path, respond_to })
            .await?
    }

    /// Converts the current source to the selected target. Resolves when the output file is
    /// written; other operations keep being served meanwhile.
    pub async fn convert(&self) -> StudioResult<ConvertedAudio> {
        self.request(|respond_to| SessionCmd::Convert { respond_to })
            .await?
    }

    pub async fn play(&self, kind: AudioKind) -> StudioResult<()> {
        self.request(|respond_to| SessionCmd::Play { kind, respond_to })
            .await?
    }

    pub async fn stop_playback(&self) -> StudioResult<()> {
        self.request(|respond_to| SessionCmd::StopPlayback { respond_to })
            .await?
    }

    pub async fn status(&self) -> StudioResult<SessionStatus> {
        self.request(|respond_to| SessionCmd::Status { respond_to })
            .await
    }

    /// Stops playback, discards an unfinished recording and ends the session task.
    pub async fn shutdown(&self) {
        if self
            .request(|respond_to| SessionCmd::Shutdown { respond_to })
            .await
            .is_err()
        {
            log::debug!("session already shut down");
        }
    }

    /// Starts the background model load. Returns `false` if it was already started.
    pub fn start_model_load(&self) -> bool {
        self.model.start()
    }

    pub fn model_ready(&self) -> bool {
        self.model.is_ready()
    }

    pub fn model_device(&self) -> Option<ComputeDevice> {
        self.model.device()
    }

    /// Starts the load if needed and waits for its outcome.
    pub async fn wait_for_model(&self) -> Result<ComputeDevice, LoadError> {
        self.model.load().await
    }
}
