use std::path::{Path, PathBuf};

use serde::Serialize;
use voicestudio_core::error::{ErrorKind, StudioError};
use voicestudio_core::types::TargetIdentity;
use voicestudio_engine::model::ModelPhase;

/// Uniform reply of every shell-facing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpResponse {
    pub success: bool,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl OpResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            file_path: None,
            error_kind: None,
        }
    }

    pub fn ok_with_path(message: impl Into<String>, path: &Path) -> Self {
        Self {
            file_path: Some(path.to_path_buf()),
            ..Self::ok(message)
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            file_path: None,
            error_kind: Some(kind),
        }
    }

    pub fn failure(err: &StudioError) -> Self {
        Self::error(err.kind(), err.to_string())
    }

    /// Builds a path-carrying response; `describe` renders the success message.
    pub fn from_path_result(
        res: &Result<PathBuf, StudioError>,
        describe: impl FnOnce(&Path) -> String,
    ) -> Self {
        match res {
            Ok(path) => Self::ok_with_path(describe(path), path),
            Err(e) => Self::failure(e),
        }
    }
}

/// Snapshot of the session for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub is_recording: bool,
    pub is_converting: bool,
    pub is_playing: bool,
    pub model: ModelPhase,
    pub selected_target: Option<TargetIdentity>,
    pub source_audio_path: Option<PathBuf>,
    pub converted_audio_path: Option<PathBuf>,
}
