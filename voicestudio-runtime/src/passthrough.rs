//! Demo model backend that needs no weights: it returns the source speech, leveled to the
//! loudness of the target voice clip. Lets the whole pipeline run on any machine.

use std::path::Path;

use anyhow::Context;
use voicestudio_core::types::ComputeDevice;
use voicestudio_engine::traits::{ModelBackend, VoiceConverter, Waveform};

#[derive(Debug, Clone, Default)]
pub struct PassthroughBackend;

impl PassthroughBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ModelBackend for PassthroughBackend {
    fn supports(&self, _device: ComputeDevice) -> bool {
        // No accelerator code path.
        false
    }

    fn from_pretrained(&self, device: ComputeDevice) -> anyhow::Result<Box<dyn VoiceConverter>> {
        log::info!("passthrough model ready on {}", device.label());
        Ok(Box::new(PassthroughConverter))
    }
}

#[derive(Debug)]
pub struct PassthroughConverter;

impl VoiceConverter for PassthroughConverter {
    fn generate(&mut self, source: &Path, target_voice: &Path) -> anyhow::Result<Waveform> {
        let mut wav = read_planes(source)
            .with_context(|| format!("read source audio: {}", source.display()))?;

        // Only WAV references can be measured; other formats keep the source level.
        let target_level = match read_planes(target_voice) {
            Ok(reference) => rms(&reference.channels),
            Err(e) => {
                log::debug!(
                    "cannot measure {}: {e:#}; keeping source level",
                    target_voice.display()
                );
                None
            }
        };

        if let (Some(want), Some(have)) = (target_level, rms(&wav.channels)) {
            let gain = want / have;
            for plane in &mut wav.channels {
                for s in plane.iter_mut() {
                    *s = (*s * gain).clamp(-1.0, 1.0);
                }
            }
        }
        Ok(wav)
    }
}

fn read_planes(path: &Path) -> anyhow::Result<Waveform> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mut planes = vec![Vec::with_capacity(interleaved.len() / channels); channels];
    for frame in interleaved.chunks(channels) {
        for (plane, s) in planes.iter_mut().zip(frame) {
            plane.push(*s);
        }
    }

    Ok(Waveform {
        sample_rate_hz: spec.sample_rate,
        channels: planes,
    })
}

/// Root mean square over all planes; `None` for silence or no samples.
fn rms(planes: &[Vec<f32>]) -> Option<f32> {
    let (sum, n) = planes
        .iter()
        .flatten()
        .fold((0.0_f64, 0_usize), |(sum, n), s| (sum + f64::from(*s).powi(2), n + 1));
    if n == 0 {
        return None;
    }
    let level = (sum / n as f64).sqrt() as f32;
    (level > f32::EPSILON).then_some(level)
}
