use std::path::Path;

use voicestudio_core::types::ComputeDevice;

/// Model output: channel-major planes at the model's native sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub sample_rate_hz: u32,
    pub channels: Vec<Vec<f32>>,
}

impl Waveform {
    pub fn mono(samples: Vec<f32>, sample_rate_hz: u32) -> Self {
        Self {
            sample_rate_hz,
            channels: vec![samples],
        }
    }

    pub fn frames(&self) -> usize {
        self.channels.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

/// A loaded voice-conversion model.
///
/// Implementations may keep per-call state, so `generate` takes `&mut self` and callers must
/// never share one instance between concurrent calls.
pub trait VoiceConverter: Send {
    /// Converts the speech in `source` to the voice heard in `target_voice`.
    fn generate(&mut self, source: &Path, target_voice: &Path) -> anyhow::Result<Waveform>;
}

/// Factory for the pretrained model plus the compute capability probe.
///
/// Both calls are blocking; they are only ever made from the blocking thread pool.
pub trait ModelBackend: Send + Sync {
    /// Whether `device` is usable on this machine. CPU is assumed and never probed.
    fn supports(&self, device: ComputeDevice) -> bool;

    fn from_pretrained(&self, device: ComputeDevice) -> anyhow::Result<Box<dyn VoiceConverter>>;
}
