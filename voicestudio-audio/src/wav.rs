use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use voicestudio_core::fsutil::replace_file;
use voicestudio_core::naming::recording_file_name;

use crate::capture::CapturedAudio;

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("No audio was recorded")]
    EmptyRecording,

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("failed to move recording into place at {}: {source}", path.display())]
    Replace {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Header facts of a WAV file on disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub frames: u32,
}

impl WavInfo {
    pub fn duration(&self) -> Duration {
        if self.sample_rate_hz == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(f64::from(self.frames) / f64::from(self.sample_rate_hz))
    }
}

/// Writes channel-major planes as a 32-bit float WAV file.
///
/// Planes shorter than the longest one are padded with silence.
pub fn write_wav(path: &Path, sample_rate_hz: u32, planes: &[Vec<f32>]) -> Result<(), hound::Error> {
    let channels = u16::try_from(planes.len().max(1)).unwrap_or(u16::MAX);
    let spec = hound::WavSpec {
        channels,
        sample_rate: sample_rate_hz,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let frames = planes.iter().map(Vec::len).max().unwrap_or(0);
    let mut writer = hound::WavWriter::create(path, spec)?;
    for i in 0..frames {
        for plane in planes {
            writer.write_sample(plane.get(i).copied().unwrap_or(0.0))?;
        }
    }
    writer.finalize()?;
    Ok(())
}

pub fn read_wav_info(path: &Path) -> Result<WavInfo, hound::Error> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    Ok(WavInfo {
        sample_rate_hz: spec.sample_rate,
        channels: spec.channels,
        frames: reader.duration(),
    })
}

/// Writes a captured buffer to `dir/recorded_<timestamp>.wav`.
///
/// Fails with [`MaterializeError::EmptyRecording`] without touching the disk when nothing
/// was captured. The file is written next to its final name and swapped in, so a failed
/// save leaves an existing file of the same name intact.
pub fn materialize_recording(
    captured: &CapturedAudio,
    dir: &Path,
    at: NaiveDateTime,
) -> Result<PathBuf, MaterializeError> {
    if captured.is_empty() {
        return Err(MaterializeError::EmptyRecording);
    }

    fs::create_dir_all(dir).map_err(|source| MaterializeError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(recording_file_name(at));
    let planes = captured.to_channel_major();

    let tmp = path.with_extension("wav.tmp");
    if let Err(source) = write_wav(&tmp, captured.sample_rate_hz, &planes) {
        let _ = fs::remove_file(&tmp);
        return Err(MaterializeError::Write { path: tmp, source });
    }
    replace_file(&tmp, &path).map_err(|source| MaterializeError::Replace {
        path: path.clone(),
        source,
    })?;

    log::info!(
        "recording saved: {} (~{:.0}ms)",
        path.display(),
        captured.duration().as_secs_f64() * 1000.0
    );
    Ok(path)
}
