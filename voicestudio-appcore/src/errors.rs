use voicestudio_audio::{AudioCaptureError, MaterializeError, PlaybackError};
use voicestudio_core::error::{PreconditionError, StudioError};

pub fn user_facing_audio_error(e: &AudioCaptureError) -> String {
    // Keep messages actionable and short; details are in logs.
    if matches!(e, AudioCaptureError::NoInputDevice) {
        return "No microphone detected. Check your mic and choose the input device in the config."
            .into();
    }

    let raw = e.to_string().to_lowercase();
    if raw.contains("permission") || raw.contains("access") {
        return "Microphone access appears blocked. Check your system privacy settings.".into();
    }

    format!("Failed to start recording: {e}")
}

pub fn from_capture(e: &AudioCaptureError) -> StudioError {
    log::error!("capture error: {e}");
    StudioError::device(user_facing_audio_error(e))
}

pub fn from_materialize(e: MaterializeError) -> StudioError {
    match e {
        MaterializeError::EmptyRecording => PreconditionError::EmptyRecording.into(),
        other => StudioError::io("Failed to save recording", other),
    }
}

pub fn from_playback(e: PlaybackError) -> StudioError {
    match e {
        PlaybackError::NoAudioAvailable(kind) => PreconditionError::NoAudioAvailable(kind).into(),
        other => StudioError::device(format!("Failed to play audio: {other}")),
    }
}
