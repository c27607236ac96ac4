use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use voicestudio_audio::{
    AudioOutput, CaptureBackend, CaptureSession, PlaybackController, materialize_recording,
};
use voicestudio_core::config::StudioConfig;
use voicestudio_core::error::{PreconditionError, StudioError, StudioResult};
use voicestudio_core::gallery::{Gallery, GallerySummary};
use voicestudio_core::naming::is_supported_audio;
use voicestudio_core::types::{AudioKind, TargetIdentity};
use voicestudio_engine::convert::{ConversionInputs, ConversionOrchestrator, ConvertedAudio};
use voicestudio_runtime::ipc::SessionStatus;

use crate::errors::{from_capture, from_materialize, from_playback};

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
pub(crate) enum SessionCmd {
    Targets {
        respond_to: Reply<Vec<TargetIdentity>>,
    },
    Summary {
        respond_to: Reply<GallerySummary>,
    },
    RescanGallery {
        respond_to: Reply<GallerySummary>,
    },
    SelectTarget {
        needle: String,
        respond_to: Reply<StudioResult<TargetIdentity>>,
    },
    StartRecording {
        respond_to: Reply<StudioResult<()>>,
    },
    StopRecording {
        respond_to: Reply<StudioResult<PathBuf>>,
    },
    LoadSourceFile {
        path: PathBuf,
        respond_to: Reply<StudioResult<PathBuf>>,
    },
    Convert {
        respond_to: Reply<StudioResult<ConvertedAudio>>,
    },
    // Posted by the conversion task, never by the handle.
    ConversionFinished {
        epoch: u64,
        result: StudioResult<ConvertedAudio>,
        respond_to: Reply<StudioResult<ConvertedAudio>>,
    },
    Play {
        kind: AudioKind,
        respond_to: Reply<StudioResult<()>>,
    },
    StopPlayback {
        respond_to: Reply<StudioResult<()>>,
    },
    Status {
        respond_to: Reply<SessionStatus>,
    },
    Shutdown {
        respond_to: Reply<()>,
    },
}

/// The single mutable record of a studio session. Only the actor task touches it.
struct SessionState {
    config: StudioConfig,
    gallery: Gallery,
    selected: Option<TargetIdentity>,
    source_audio: Option<PathBuf>,
    converted_audio: Option<PathBuf>,

    // Some while recording.
    capture: Option<CaptureSession>,
    converting: bool,

    // Bumped whenever the source file or the selected target changes.
    epoch: u64,
}

impl SessionState {
    fn new(config: StudioConfig) -> Self {
        let gallery = Gallery::scan(&config.images_dir, &config.voices_dir);
        Self {
            config,
            gallery,
            selected: None,
            source_audio: None,
            converted_audio: None,
            capture: None,
            converting: false,
            epoch: 0,
        }
    }

    fn is_recording(&self) -> bool {
        self.capture.is_some()
    }

    /// The converted clip no longer matches the source/target pair.
    fn invalidate_conversion(&mut self) {
        self.epoch += 1;
        if let Some(old) = self.converted_audio.take() {
            log::debug!("selection changed, forgetting {}", old.display());
        }
    }

    fn set_source(&mut self, path: PathBuf) {
        self.source_audio = Some(path);
        self.invalidate_conversion();
    }
}

pub(crate) struct SessionActor {
    state: SessionState,
    capture_backend: Arc<dyn CaptureBackend>,
    playback: PlaybackController,
    orchestrator: ConversionOrchestrator,
    rx: mpsc::Receiver<SessionCmd>,

    // Weak so the actor stops once every handle is dropped.
    tx: mpsc::WeakSender<SessionCmd>,
}

impl SessionActor {
    /// Spawns the actor on the current tokio runtime and returns its command sender.
    pub(crate) fn spawn(
        config: StudioConfig,
        capture_backend: Arc<dyn CaptureBackend>,
        output: Box<dyn AudioOutput>,
        orchestrator: ConversionOrchestrator,
    ) -> mpsc::Sender<SessionCmd> {
        let (tx, rx) = mpsc::channel(32);
        let actor = SessionActor {
            state: SessionState::new(config),
            capture_backend,
            playback: PlaybackController::new(output),
            orchestrator,
            rx,
            tx: tx.downgrade(),
        };
        tokio::spawn(actor.run());
        tx
    }

    async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            if !self.handle(cmd).await {
                return;
            }
        }
        self.shutdown().await;
    }

    /// Returns `false` once the session was shut down.
    async fn handle(&mut self, cmd: SessionCmd) -> bool {
        match cmd {
            SessionCmd::Targets { respond_to } => {
                let _ = respond_to.send(self.state.gallery.targets().to_vec());
            }
            SessionCmd::Summary { respond_to } => {
                let _ = respond_to.send(self.state.gallery.summary());
            }
            SessionCmd::RescanGallery { respond_to } => {
                let _ = respond_to.send(self.rescan_gallery());
            }
            SessionCmd::SelectTarget { needle, respond_to } => {
                let _ = respond_to.send(self.select_target(&needle));
            }
            SessionCmd::StartRecording { respond_to } => {
                let _ = respond_to.send(self.start_recording().await);
            }
            SessionCmd::StopRecording { respond_to } => {
                let _ = respond_to.send(self.stop_recording().await);
            }
            SessionCmd::LoadSourceFile { path, respond_to } => {
                let _ = respond_to.send(self.load_source_file(path));
            }
            SessionCmd::Convert { respond_to } => self.convert(respond_to),
            SessionCmd::ConversionFinished {
                epoch,
                result,
                respond_to,
            } => {
                self.conversion_finished(epoch, &result);
                let _ = respond_to.send(result);
            }
            SessionCmd::Play { kind, respond_to } => {
                let _ = respond_to.send(self.play(kind));
            }
            SessionCmd::StopPlayback { respond_to } => {
                let _ = respond_to.send(self.playback.stop().map_err(from_playback));
            }
            SessionCmd::Status { respond_to } => {
                let _ = respond_to.send(self.status());
            }
            SessionCmd::Shutdown { respond_to } => {
                self.shutdown().await;
                let _ = respond_to.send(());
                return false;
            }
        }
        true
    }

    fn rescan_gallery(&mut self) -> GallerySummary {
        let gallery = Gallery::scan(&self.state.config.images_dir, &self.state.config.voices_dir);

        // Pick up new voice files for the selected target. A target that vanished stays
        // selected; its files are checked again at conversion time.
        if let Some(selected) = &self.state.selected {
            match gallery.find(selected.id.as_str()) {
                Some(fresh) if fresh != selected => {
                    let fresh = fresh.clone();
                    self.state.selected = Some(fresh);
                    self.state.invalidate_conversion();
                }
                Some(_) => {}
                None => log::warn!(
                    "selected target {} is no longer in the gallery",
                    selected.id
                ),
            }
        }

        self.state.gallery = gallery;
        let summary = self.state.gallery.summary();
        log::info!(
            "gallery rescanned: {} target(s), {} with voice",
            summary.total,
            summary.with_voice
        );
        summary
    }

    fn select_target(&mut self, needle: &str) -> StudioResult<TargetIdentity> {
        let target = self
            .state
            .gallery
            .find(needle)
            .cloned()
            .ok_or_else(|| PreconditionError::TargetNotFound(needle.trim().to_string()))?;

        if !target.has_voice() {
            log::warn!(
                "{} has no voice file; it can be previewed but not converted to",
                target.display_name
            );
        }

        let changed = self.state.selected.as_ref() != Some(&target);
        self.state.selected = Some(target.clone());
        if changed {
            self.state.invalidate_conversion();
        }
        log::info!("selected target: {}", target.display_name);
        Ok(target)
    }

    async fn start_recording(&mut self) -> StudioResult<()> {
        if self.state.is_recording() {
            return Err(PreconditionError::AlreadyRecording.into());
        }

        let backend = self.capture_backend.clone();
        let config = self.state.config.capture;
        let session = tokio::task::spawn_blocking(move || CaptureSession::start(backend, config))
            .await
            .map_err(|e| StudioError::device(format!("capture task failed: {e}")))?
            .map_err(|e| from_capture(&e))?;

        self.state.capture = Some(session);
        Ok(())
    }

    async fn stop_recording(&mut self) -> StudioResult<PathBuf> {
        let session = self
            .state
            .capture
            .take()
            .ok_or(PreconditionError::NotRecording)?;

        let dir = self.state.config.recordings_dir.clone();
        let saved = tokio::task::spawn_blocking(move || {
            let captured = session.stop();
            materialize_recording(&captured, &dir, chrono::Local::now().naive_local())
        })
        .await
        .map_err(|e| StudioError::device(format!("capture task failed: {e}")))?;

        let path = saved.map_err(from_materialize)?;
        self.state.set_source(path.clone());
        Ok(path)
    }

    fn load_source_file(&mut self, path: PathBuf) -> StudioResult<PathBuf> {
        if self.state.is_recording() {
            return Err(PreconditionError::RecordingInProgress.into());
        }
        if !path.is_file() {
            log::warn!("cannot load {}: not a file", path.display());
            return Err(PreconditionError::NoSourceAudio.into());
        }
        if !is_supported_audio(&path) {
            log::warn!("cannot load {}: unsupported audio format", path.display());
            return Err(PreconditionError::NoSourceAudio.into());
        }

        log::info!("loaded source audio: {}", path.display());
        self.state.set_source(path.clone());
        Ok(path)
    }

    fn convert(&mut self, respond_to: Reply<StudioResult<ConvertedAudio>>) {
        if self.state.converting {
            let _ = respond_to.send(Err(PreconditionError::ConversionInProgress.into()));
            return;
        }

        let inputs = ConversionInputs {
            recording: self.state.is_recording(),
            source: self.state.source_audio.as_deref(),
            target: self.state.selected.as_ref(),
        };
        let job = match self.orchestrator.prepare(inputs) {
            Ok(job) => job,
            Err(e) => {
                let _ = respond_to.send(Err(e));
                return;
            }
        };
        let Some(tx) = self.tx.upgrade() else {
            let _ = respond_to.send(Err(StudioError::SessionClosed));
            return;
        };

        self.state.converting = true;
        let epoch = self.state.epoch;
        tokio::spawn(async move {
            let result = job.run().await;
            let finished = SessionCmd::ConversionFinished {
                epoch,
                result,
                respond_to,
            };
            // The actor is gone: answer the caller directly.
            if let Err(mpsc::error::SendError(SessionCmd::ConversionFinished {
                result,
                respond_to,
                ..
            })) = tx.send(finished).await
            {
                let _ = respond_to.send(result);
            }
        });
    }

    fn conversion_finished(&mut self, epoch: u64, result: &StudioResult<ConvertedAudio>) {
        self.state.converting = false;
        match result {
            Ok(done) if epoch == self.state.epoch => {
                self.state.converted_audio = Some(done.path.clone());
            }
            Ok(done) => log::info!(
                "source or target changed during conversion; {} is not the current result",
                done.path.display()
            ),
            Err(e) => log::error!("conversion failed: {e}"),
        }
    }

    fn play(&mut self, kind: AudioKind) -> StudioResult<()> {
        let path = match kind {
            AudioKind::Original => self.state.source_audio.as_deref(),
            AudioKind::Converted => self.state.converted_audio.as_deref(),
        };
        self.playback.play(kind, path).map_err(from_playback)
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            is_recording: self.state.is_recording(),
            is_converting: self.state.converting,
            is_playing: self.playback.is_playing(),
            model: self.orchestrator.model().phase(),
            selected_target: self.state.selected.clone(),
            source_audio_path: self.state.source_audio.clone(),
            converted_audio_path: self.state.converted_audio.clone(),
        }
    }

    /// Stops playback and discards an unfinished recording.
    async fn shutdown(&mut self) {
        if let Err(e) = self.playback.stop() {
            log::warn!("failed to stop playback on shutdown: {e}");
        }
        if let Some(session) = self.state.capture.take() {
            log::info!("discarding unfinished recording");
            let _ = tokio::task::spawn_blocking(move || session.stop()).await;
        }
    }
}
