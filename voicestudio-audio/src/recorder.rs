//
// CPAL-based capture backend.
//
// The stream is built and owned on the capture thread (cpal streams are not `Send`).
// Every device callback converts its buffer to interleaved f32 and hands it to the
// block sink as one block.

use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Sample, SampleFormat, SizedSample, Stream};
use voicestudio_core::config::CaptureConfig;

use crate::capture::{AudioCaptureError, BlockSink, CaptureBackend};

const STOP_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Default)]
pub struct CpalCapture {
    // Preferred input device name; the default input is used when absent or not found.
    device_name: Option<String>,
}

impl CpalCapture {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name: device_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
    }

    pub fn list_input_device_names() -> Result<Vec<String>, AudioCaptureError> {
        let host = cpal::default_host();
        let mut out = Vec::new();
        for dev in host.input_devices()? {
            if let Ok(name) = dev.name() {
                out.push(name);
            }
        }
        out.sort();
        out.dedup();
        Ok(out)
    }

    fn pick_device(&self) -> Result<Device, AudioCaptureError> {
        let host = cpal::default_host();

        if let Some(needle) = self.device_name.as_deref() {
            if let Ok(devices) = host.input_devices() {
                for dev in devices {
                    if let Ok(name) = dev.name() {
                        if name == needle {
                            log::info!("Using input device: {name}");
                            return Ok(dev);
                        }
                    }
                }
            }

            log::warn!("Preferred input device not found, falling back to default: {needle}");
        }

        host.default_input_device()
            .ok_or(AudioCaptureError::NoInputDevice)
    }
}

impl CaptureBackend for CpalCapture {
    fn run(
        &self,
        config: &CaptureConfig,
        sink: BlockSink,
        on_ready: &mut dyn FnMut(),
    ) -> Result<(), AudioCaptureError> {
        let device = self.pick_device()?;
        let sample_format = pick_sample_format(&device, config)?;

        let fixed = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate_hz),
            buffer_size: cpal::BufferSize::Fixed(config.block_frames),
        };

        let stream = match build_for_format(&device, &fixed, sample_format, sink.clone()) {
            Ok(s) => s,
            Err(e) => {
                // Many drivers reject fixed buffer sizes; blocks then follow the device's own size.
                log::warn!(
                    "fixed block size {} rejected ({e}), using device default",
                    config.block_frames
                );
                let flexible = cpal::StreamConfig {
                    buffer_size: cpal::BufferSize::Default,
                    ..fixed
                };
                build_for_format(&device, &flexible, sample_format, sink.clone())?
            }
        };

        if let Err(e) = stream.play() {
            log::error!("Audio stream play failed: {e}");
            return Err(e.into());
        }

        on_ready();

        sink.wait_stopped(STOP_POLL);

        // Dropping the stream tears the device down; the callback finishes its current block first.
        drop(stream);
        Ok(())
    }
}

fn pick_sample_format(
    device: &Device,
    config: &CaptureConfig,
) -> Result<SampleFormat, AudioCaptureError> {
    let rate = cpal::SampleRate(config.sample_rate_hz);
    let mut candidates: Vec<SampleFormat> = device
        .supported_input_configs()?
        .filter(|range| {
            range.channels() == config.channels
                && range.min_sample_rate() <= rate
                && rate <= range.max_sample_rate()
        })
        .map(|range| range.sample_format())
        .collect();

    if candidates.is_empty() {
        return Err(AudioCaptureError::UnsupportedConfig {
            sample_rate_hz: config.sample_rate_hz,
            channels: config.channels,
        });
    }

    // Prefer float input to avoid a lossy conversion step.
    candidates.sort_by_key(|f| if *f == SampleFormat::F32 { 0 } else { 1 });
    Ok(candidates[0])
}

fn build_for_format(
    device: &Device,
    config: &cpal::StreamConfig,
    sample_format: SampleFormat,
    sink: BlockSink,
) -> Result<Stream, cpal::BuildStreamError> {
    match sample_format {
        SampleFormat::F32 => build_input_stream::<f32>(device, config, sink),
        SampleFormat::I16 => build_input_stream::<i16>(device, config, sink),
        SampleFormat::U16 => build_input_stream::<u16>(device, config, sink),
        SampleFormat::I8 => build_input_stream::<i8>(device, config, sink),
        SampleFormat::U8 => build_input_stream::<u8>(device, config, sink),
        SampleFormat::I32 => build_input_stream::<i32>(device, config, sink),
        SampleFormat::U32 => build_input_stream::<u32>(device, config, sink),
        SampleFormat::F64 => build_input_stream::<f64>(device, config, sink),
        _ => build_input_stream::<f32>(device, config, sink),
    }
}

fn build_input_stream<T>(
    device: &Device,
    config: &cpal::StreamConfig,
    sink: BlockSink,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: Sample + SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let cb = move |data: &[T], _: &cpal::InputCallbackInfo| {
        if sink.is_stopped() {
            return;
        }
        let block: Vec<f32> = data.iter().map(|&s| s.to_sample::<f32>()).collect();
        sink.push(block);
    };

    device.build_input_stream(
        config,
        cb,
        |err| {
            // Stream errors don't end the recording; what was captured so far is kept.
            log::error!("Audio stream error: {err}");
        },
        None,
    )
}
