use chrono::NaiveDateTime;
use std::path::Path;

pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

// Checked in this order; the first existing voice file wins.
pub const VOICE_EXTENSIONS: [&str; 6] = ["wav", "mp3", "m4a", "flac", "aac", "ogg"];

pub const RECORDING_PREFIX: &str = "recorded_";

/// Human-readable name for a gallery key: `_` becomes a space and every word is title-cased.
///
/// `"alice"` -> `"Alice"`, `"john_SMITH"` -> `"John Smith"`.
pub fn display_name_for_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_alpha = false;
    for ch in key.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// `recorded_<YYYYMMDD_HHMMSS>.wav`
pub fn recording_file_name(at: NaiveDateTime) -> String {
    format!("{RECORDING_PREFIX}{}.wav", at.format("%Y%m%d_%H%M%S"))
}

/// `<sourceBaseName>_as_<TargetName>.wav`, with spaces in the target name replaced by `_`.
pub fn converted_file_name(source: &Path, target_display_name: &str) -> String {
    let base = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".into());
    let target = target_display_name.replace(' ', "_");
    format!("{base}_as_{target}.wav")
}

pub fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_supported_audio(path: &Path) -> bool {
    extension_lowercase(path)
        .map(|e| VOICE_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}
