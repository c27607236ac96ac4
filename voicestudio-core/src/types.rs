use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Stable key of a target identity: the base filename shared by its image and voice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A selectable voice persona: a display image plus an optional reference voice clip.
///
/// Built once per gallery scan and never mutated afterwards. `has_voice` is derived
/// from `voice_path`, so the two can't disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetIdentity {
    pub id: TargetId,
    pub display_name: String,
    pub image_path: PathBuf,
    voice_path: Option<PathBuf>,
    has_voice: bool,
}

impl TargetIdentity {
    pub fn new(
        id: TargetId,
        display_name: impl Into<String>,
        image_path: PathBuf,
        voice_path: Option<PathBuf>,
    ) -> Self {
        let has_voice = voice_path.is_some();
        Self {
            id,
            display_name: display_name.into(),
            image_path,
            voice_path,
            has_voice,
        }
    }

    pub fn voice_path(&self) -> Option<&Path> {
        self.voice_path.as_deref()
    }

    pub fn has_voice(&self) -> bool {
        self.has_voice
    }

    /// Whether `needle` names this identity, either by key or by display name.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim();
        self.id.as_str() == needle || self.display_name == needle
    }
}

/// Which clip the playback controller should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioKind {
    Original,
    Converted,
}

impl AudioKind {
    pub fn label(self) -> &'static str {
        match self {
            AudioKind::Original => "original",
            AudioKind::Converted => "converted",
        }
    }
}

impl fmt::Display for AudioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for AudioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Ok(AudioKind::Original),
            "converted" => Ok(AudioKind::Converted),
            other => Err(format!("unknown audio kind: {other}")),
        }
    }
}

/// Compute device the inference engine runs on, in probe priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeDevice {
    Cuda,
    Mps,
    Cpu,
}

impl ComputeDevice {
    /// Probe order: GPU-class accelerator, secondary accelerator, general-purpose compute.
    pub const PROBE_ORDER: [ComputeDevice; 3] =
        [ComputeDevice::Cuda, ComputeDevice::Mps, ComputeDevice::Cpu];

    pub fn as_str(self) -> &'static str {
        match self {
            ComputeDevice::Cuda => "cuda",
            ComputeDevice::Mps => "mps",
            ComputeDevice::Cpu => "cpu",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ComputeDevice::Cuda => "GPU (CUDA)",
            ComputeDevice::Mps => "GPU (Metal)",
            ComputeDevice::Cpu => "CPU",
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_voice_follows_voice_path() {
        let with = TargetIdentity::new(
            TargetId::new("alice"),
            "Alice",
            PathBuf::from("images/alice.png"),
            Some(PathBuf::from("voices/alice.wav")),
        );
        let without = TargetIdentity::new(
            TargetId::new("bob"),
            "Bob",
            PathBuf::from("images/bob.png"),
            None,
        );

        assert!(with.has_voice());
        assert_eq!(with.voice_path(), Some(Path::new("voices/alice.wav")));
        assert!(!without.has_voice());
        assert!(without.voice_path().is_none());
    }

    #[test]
    fn serializes_has_voice_for_ui() {
        let t = TargetIdentity::new(
            TargetId::new("alice"),
            "Alice",
            PathBuf::from("images/alice.png"),
            None,
        );
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["has_voice"], serde_json::Value::Bool(false));
        assert_eq!(v["display_name"], "Alice");
    }

    #[test]
    fn parses_audio_kind() {
        assert_eq!("Original".parse::<AudioKind>().unwrap(), AudioKind::Original);
        assert_eq!(" converted ".parse::<AudioKind>().unwrap(), AudioKind::Converted);
        assert!("both".parse::<AudioKind>().is_err());
    }
}
