//! Shell-facing wrappers: each session operation rendered as an [`OpResponse`].

use std::path::{Path, PathBuf};

use voicestudio_core::error::ErrorKind;
use voicestudio_core::types::AudioKind;
use voicestudio_runtime::ipc::OpResponse;

use crate::service::StudioService;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub async fn load_model(svc: &StudioService) -> OpResponse {
    match svc.wait_for_model().await {
        Ok(device) => OpResponse::ok(format!("Model loaded successfully on {}!", device.label())),
        Err(e) => OpResponse::error(ErrorKind::Engine, e.to_string()),
    }
}

pub async fn rescan_gallery(svc: &StudioService) -> OpResponse {
    match svc.rescan_gallery().await {
        Ok(summary) => OpResponse::ok(format!(
            "Found {} target(s), {} with a voice sample",
            summary.total, summary.with_voice
        )),
        Err(e) => OpResponse::failure(&e),
    }
}

pub async fn select_target(svc: &StudioService, needle: &str) -> OpResponse {
    match svc.select_target(needle).await {
        Ok(target) if target.has_voice() => {
            OpResponse::ok(format!("Selected {}", target.display_name))
        }
        Ok(target) => OpResponse::ok(format!(
            "Selected {} (no voice sample, preview only)",
            target.display_name
        )),
        Err(e) => OpResponse::failure(&e),
    }
}

pub async fn start_recording(svc: &StudioService) -> OpResponse {
    match svc.start_recording().await {
        Ok(()) => OpResponse::ok("Recording started"),
        Err(e) => OpResponse::failure(&e),
    }
}

pub async fn stop_recording(svc: &StudioService) -> OpResponse {
    let res = svc.stop_recording().await;
    OpResponse::from_path_result(&res, |p| format!("Recording saved as {}", file_name(p)))
}

pub async fn load_source_file(svc: &StudioService, path: PathBuf) -> OpResponse {
    let res = svc.load_source_file(path).await;
    OpResponse::from_path_result(&res, |p| format!("Loaded: {}", file_name(p)))
}

pub async fn convert(svc: &StudioService) -> OpResponse {
    match svc.convert().await {
        Ok(done) => OpResponse::ok_with_path(
            format!("Successfully converted to {}!", done.target_name),
            &done.path,
        ),
        Err(e) => OpResponse::failure(&e),
    }
}

pub async fn play(svc: &StudioService, kind: AudioKind) -> OpResponse {
    match svc.play(kind).await {
        Ok(()) => OpResponse::ok(format!("Playing {kind} audio")),
        Err(e) => OpResponse::failure(&e),
    }
}

pub async fn stop_playback(svc: &StudioService) -> OpResponse {
    match svc.stop_playback().await {
        Ok(()) => OpResponse::ok("Audio stopped"),
        Err(e) => OpResponse::failure(&e),
    }
}
