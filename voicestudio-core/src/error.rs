use serde::Serialize;
use thiserror::Error;

use crate::types::AudioKind;

/// User-correctable failures: something the user has to do first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not currently recording")]
    NotRecording,

    #[error("No audio was recorded")]
    EmptyRecording,

    #[error("Recording in progress. Stop the recording first.")]
    RecordingInProgress,

    #[error("A conversion is already running. Please wait for it to finish.")]
    ConversionInProgress,

    #[error("Model not loaded. Please wait for initialization.")]
    ModelNotReady,

    #[error("Model failed to load: {0}")]
    ModelFailed(String),

    #[error("Please record or load an audio file first.")]
    NoSourceAudio,

    #[error("Please select a valid target voice first.")]
    NoTargetVoice,

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("No {0} audio file available.")]
    NoAudioAvailable(AudioKind),
}

/// Coarse class of a [`StudioError`], stable for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Precondition,
    Device,
    Engine,
    Io,
}

#[derive(Debug, Error)]
pub enum StudioError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Failed to convert audio: {0}")]
    Engine(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    // The session task is gone; only happens during shutdown.
    #[error("session is shut down")]
    SessionClosed,
}

impl StudioError {
    pub fn device(e: impl std::fmt::Display) -> Self {
        Self::Device(e.to_string())
    }

    pub fn engine(e: impl std::fmt::Display) -> Self {
        Self::Engine(e.to_string())
    }

    pub fn io(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Io {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StudioError::Precondition(_) => ErrorKind::Precondition,
            StudioError::Device(_) | StudioError::SessionClosed => ErrorKind::Device,
            StudioError::Engine(_) => ErrorKind::Engine,
            StudioError::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn precondition(&self) -> Option<&PreconditionError> {
        match self {
            StudioError::Precondition(p) => Some(p),
            _ => None,
        }
    }
}

pub type StudioResult<T> = Result<T, StudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_facing() {
        let e: StudioError = PreconditionError::NoAudioAvailable(AudioKind::Converted).into();
        assert_eq!(e.to_string(), "No converted audio file available.");
        assert_eq!(e.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn io_error_keeps_context() {
        let e = StudioError::io(
            "Failed to save recording",
            std::io::Error::other("disk full"),
        );
        assert_eq!(e.kind(), ErrorKind::Io);
        assert!(e.to_string().starts_with("Failed to save recording: disk full"));
    }
}
