use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;
pub const DEFAULT_CHANNELS: u16 = 2;
pub const DEFAULT_BLOCK_FRAMES: u32 = 1_024;

/// Capture parameters handed to the audio input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub sample_rate_hz: u32,
    pub channels: u16,

    // Frames per delivered block. Devices that cannot honor a fixed buffer size
    // fall back to their own block size.
    pub block_frames: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            channels: DEFAULT_CHANNELS,
            block_frames: DEFAULT_BLOCK_FRAMES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioConfig {
    pub recordings_dir: PathBuf,
    pub converted_dir: PathBuf,
    pub images_dir: PathBuf,
    pub voices_dir: PathBuf,

    #[serde(default)]
    pub capture: CaptureConfig,

    // Preferred input device name. Falls back to the default input if absent.
    #[serde(default)]
    pub input_device: Option<String>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self::rooted_at(Path::new("."))
    }
}

impl StudioConfig {
    /// Standard directory layout below `root`.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            recordings_dir: root.join("recordings"),
            converted_dir: root.join("converted"),
            images_dir: root.join("images"),
            voices_dir: root.join("voices"),
            capture: CaptureConfig::default(),
            input_device: None,
        }
    }

    pub fn managed_dirs(&self) -> [&Path; 4] {
        [
            &self.recordings_dir,
            &self.converted_dir,
            &self.images_dir,
            &self.voices_dir,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_capture_section_uses_defaults() {
        let raw = r#"{
            "recordings_dir": "r",
            "converted_dir": "c",
            "images_dir": "i",
            "voices_dir": "v"
        }"#;
        let cfg: StudioConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.capture, CaptureConfig::default());
        assert_eq!(cfg.capture.sample_rate_hz, 44_100);
        assert_eq!(cfg.capture.channels, 2);
        assert!(cfg.input_device.is_none());
    }

    #[test]
    fn rooted_layout() {
        let cfg = StudioConfig::rooted_at(Path::new("/tmp/studio"));
        assert_eq!(cfg.converted_dir, PathBuf::from("/tmp/studio/converted"));
        assert_eq!(cfg.managed_dirs().len(), 4);
    }
}
