pub mod convert;
pub mod model;
pub mod traits;

pub use convert::{ConversionInputs, ConversionOrchestrator, ConvertedAudio, PreparedConversion};
pub use model::{LoadError, ModelManager, ModelPhase, SharedConverter, select_device};
pub use traits::{ModelBackend, VoiceConverter, Waveform};
