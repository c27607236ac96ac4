use std::path::{Path, PathBuf};

use tokio::sync::OwnedMutexGuard;
use voicestudio_audio::wav::write_wav;
use voicestudio_core::error::{PreconditionError, StudioError, StudioResult};
use voicestudio_core::fsutil::{ensure_dir, replace_file};
use voicestudio_core::naming::converted_file_name;
use voicestudio_core::types::TargetIdentity;

use crate::model::ModelManager;
use crate::traits::VoiceConverter;

/// What the session knows when a conversion is requested.
#[derive(Debug, Clone, Copy)]
pub struct ConversionInputs<'a> {
    pub recording: bool,
    pub source: Option<&'a Path>,
    pub target: Option<&'a TargetIdentity>,
}

/// Validates conversion preconditions and hands out exclusive use of the engine.
#[derive(Clone)]
pub struct ConversionOrchestrator {
    model: ModelManager,
    converted_dir: PathBuf,
}

impl ConversionOrchestrator {
    pub fn new(model: ModelManager, converted_dir: impl Into<PathBuf>) -> Self {
        Self {
            model,
            converted_dir: converted_dir.into(),
        }
    }

    pub fn model(&self) -> &ModelManager {
        &self.model
    }

    /// Checks, in order: a conversion already running, a recording in progress, model
    /// readiness, the source file, the target voice file. The first failure wins.
    ///
    /// On success the returned value holds the engine until it is run or dropped.
    pub fn prepare(&self, inputs: ConversionInputs<'_>) -> StudioResult<PreparedConversion> {
        let engine = match self.model.converter() {
            Ok(shared) => Ok(shared
                .try_lock_owned()
                .map_err(|_| PreconditionError::ConversionInProgress)?),
            Err(e) => Err(e),
        };

        if inputs.recording {
            return Err(PreconditionError::RecordingInProgress.into());
        }
        let engine = engine?;

        let source = inputs
            .source
            .filter(|p| p.is_file())
            .ok_or(PreconditionError::NoSourceAudio)?;

        let target = inputs.target.ok_or(PreconditionError::NoTargetVoice)?;
        let target_voice = target
            .voice_path()
            .filter(|p| p.is_file())
            .ok_or(PreconditionError::NoTargetVoice)?;

        let output = self
            .converted_dir
            .join(converted_file_name(source, &target.display_name));

        Ok(PreparedConversion {
            engine,
            source: source.to_path_buf(),
            target_voice: target_voice.to_path_buf(),
            target_name: target.display_name.clone(),
            output,
        })
    }
}

/// A finished conversion: the written file and who it sounds like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedAudio {
    pub path: PathBuf,
    pub target_name: String,
}

/// A validated conversion holding the engine exclusively.
pub struct PreparedConversion {
    engine: OwnedMutexGuard<Box<dyn VoiceConverter>>,
    source: PathBuf,
    target_voice: PathBuf,
    target_name: String,
    output: PathBuf,
}

impl PreparedConversion {
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Runs the engine on the blocking pool and writes the result, replacing any earlier
    /// output for the same source/target pair. Not cancellable once started.
    pub async fn run(self) -> StudioResult<ConvertedAudio> {
        tokio::task::spawn_blocking(move || self.run_blocking())
            .await
            .map_err(|e| StudioError::engine(format!("conversion task failed: {e}")))?
    }

    fn run_blocking(mut self) -> StudioResult<ConvertedAudio> {
        log::info!(
            "converting {} -> {}",
            self.source.display(),
            self.target_name
        );

        let wav = self
            .engine
            .generate(&self.source, &self.target_voice)
            .map_err(|e| StudioError::engine(format!("{e:#}")))?;

        // The engine is free again; only file I/O remains.
        drop(self.engine);

        if wav.is_empty() {
            return Err(StudioError::engine("engine returned an empty waveform"));
        }

        let dir = self
            .output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        ensure_dir(&dir).map_err(|e| StudioError::io("Failed to save converted audio", e))?;

        let tmp = self.output.with_extension("wav.tmp");
        if let Err(e) = write_wav(&tmp, wav.sample_rate_hz, &wav.channels) {
            let _ = std::fs::remove_file(&tmp);
            return Err(StudioError::io("Failed to save converted audio", e));
        }
        replace_file(&tmp, &self.output)
            .map_err(|e| StudioError::io("Failed to save converted audio", e))?;

        log::info!("converted audio saved: {}", self.output.display());
        Ok(ConvertedAudio {
            path: self.output,
            target_name: self.target_name,
        })
    }
}
