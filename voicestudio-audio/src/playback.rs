use std::path::{Path, PathBuf};

use voicestudio_core::types::AudioKind;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("No {0} audio file available.")]
    NoAudioAvailable(AudioKind),

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    #[error("audio output error: {0}")]
    Output(String),

    #[error("audio output worker is gone")]
    Channel,
}

/// A file-backed audio output device holding at most one clip.
pub trait AudioOutput: Send {
    /// Loads `path` and starts playing it, replacing anything loaded before.
    fn play_file(&mut self, path: &Path) -> Result<(), PlaybackError>;

    /// Stops playback and releases the loaded clip.
    fn stop(&mut self) -> Result<(), PlaybackError>;

    fn is_playing(&self) -> bool;
}

/// `stopped -> playing -> stopped`, never more than one active stream.
pub struct PlaybackController {
    output: Box<dyn AudioOutput>,
    current: Option<AudioKind>,
}

impl PlaybackController {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            current: None,
        }
    }

    /// Plays the clip `kind` resolved to. A clip that is still playing is stopped first.
    pub fn play(&mut self, kind: AudioKind, path: Option<&Path>) -> Result<(), PlaybackError> {
        let path = match path {
            Some(p) if p.is_file() => p,
            _ => return Err(PlaybackError::NoAudioAvailable(kind)),
        };

        if self.output.is_playing() {
            log::info!(
                "stopping {} audio before playing {kind}",
                self.current.map(AudioKind::label).unwrap_or("current")
            );
            self.output.stop()?;
        }
        self.current = None;

        self.output.play_file(path)?;
        self.current = Some(kind);
        log::info!("playing {kind} audio: {}", path.display());
        Ok(())
    }

    /// Idempotent: stopping while stopped succeeds without touching the device.
    pub fn stop(&mut self) -> Result<(), PlaybackError> {
        if self.current.take().is_none() && !self.output.is_playing() {
            return Ok(());
        }
        self.output.stop()
    }

    pub fn is_playing(&self) -> bool {
        self.output.is_playing()
    }

    /// The clip currently audible, if any. A clip that ran to its end reads as stopped.
    pub fn now_playing(&self) -> Option<AudioKind> {
        self.current.filter(|_| self.output.is_playing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Journal(Arc<Mutex<Vec<String>>>);

    impl Journal {
        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct FakeOutput {
        journal: Journal,
        loaded: Option<PathBuf>,
        max_streams: Arc<Mutex<usize>>,
    }

    impl AudioOutput for FakeOutput {
        fn play_file(&mut self, path: &Path) -> Result<(), PlaybackError> {
            let streams = usize::from(self.loaded.is_some()) + 1;
            let mut max = self.max_streams.lock().unwrap();
            *max = (*max).max(streams);
            self.loaded = Some(path.to_path_buf());
            self.journal
                .0
                .lock()
                .unwrap()
                .push(format!("play {}", path.file_name().unwrap().to_string_lossy()));
            Ok(())
        }

        fn stop(&mut self) -> Result<(), PlaybackError> {
            self.loaded = None;
            self.journal.0.lock().unwrap().push("stop".into());
            Ok(())
        }

        fn is_playing(&self) -> bool {
            self.loaded.is_some()
        }
    }

    fn controller() -> (PlaybackController, Journal, Arc<Mutex<usize>>) {
        let journal = Journal::default();
        let max_streams = Arc::new(Mutex::new(0));
        let output = FakeOutput {
            journal: journal.clone(),
            loaded: None,
            max_streams: max_streams.clone(),
        };
        (PlaybackController::new(Box::new(output)), journal, max_streams)
    }

    #[test]
    fn switching_clips_stops_the_current_one_first() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("orig.wav");
        let converted = dir.path().join("conv.wav");
        std::fs::write(&original, b"x").unwrap();
        std::fs::write(&converted, b"x").unwrap();

        let (mut pc, journal, max_streams) = controller();
        pc.play(AudioKind::Converted, Some(&converted)).unwrap();
        assert_eq!(pc.now_playing(), Some(AudioKind::Converted));

        pc.play(AudioKind::Original, Some(&original)).unwrap();
        assert_eq!(pc.now_playing(), Some(AudioKind::Original));

        assert_eq!(
            journal.entries(),
            vec!["play conv.wav", "stop", "play orig.wav"]
        );
        assert_eq!(*max_streams.lock().unwrap(), 1);
    }

    #[test]
    fn missing_clip_is_no_audio_available() {
        let dir = tempfile::tempdir().unwrap();
        let (mut pc, journal, _) = controller();

        let err = pc.play(AudioKind::Original, None).unwrap_err();
        assert!(matches!(err, PlaybackError::NoAudioAvailable(AudioKind::Original)));

        let gone = dir.path().join("gone.wav");
        let err = pc.play(AudioKind::Converted, Some(&gone)).unwrap_err();
        assert!(matches!(err, PlaybackError::NoAudioAvailable(AudioKind::Converted)));
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("a.wav");
        std::fs::write(&clip, b"x").unwrap();

        let (mut pc, journal, _) = controller();
        pc.stop().unwrap();
        assert!(journal.entries().is_empty());

        pc.play(AudioKind::Original, Some(&clip)).unwrap();
        pc.stop().unwrap();
        pc.stop().unwrap();
        assert!(!pc.is_playing());
        assert_eq!(journal.entries(), vec!["play a.wav", "stop"]);
    }
}
