pub mod capture;
pub mod output;
pub mod playback;
pub mod recorder;
pub mod wav;

pub use capture::{AudioCaptureError, BlockSink, CaptureBackend, CaptureSession, CapturedAudio};
pub use output::RodioOutput;
pub use playback::{AudioOutput, PlaybackController, PlaybackError};
pub use recorder::CpalCapture;
pub use wav::{MaterializeError, WavInfo, materialize_recording, read_wav_info, write_wav};
