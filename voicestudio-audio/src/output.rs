//
// Rodio-backed audio output.
//
// rodio's `OutputStream` is not `Send`, so it lives on a worker thread for the whole
// process and is driven through a command channel.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use rodio::{Decoder, OutputStreamBuilder, Sink};

use crate::playback::{AudioOutput, PlaybackError};

enum Cmd {
    Play(PathBuf, mpsc::Sender<Result<(), PlaybackError>>),
    Stop(mpsc::Sender<()>),
    IsPlaying(mpsc::Sender<bool>),
    Shutdown,
}

const STARTUP_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RodioOutput {
    cmd_tx: mpsc::Sender<Cmd>,
    worker_handle: Option<JoinHandle<()>>,
}

impl RodioOutput {
    /// Opens the default output device. Failing here is fatal for the app.
    pub fn open_default() -> Result<Self, PlaybackError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Cmd>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        let worker_handle = std::thread::Builder::new()
            .name("voicestudio-playback".into())
            .spawn(move || {
                let mut stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(s) => s,
                    Err(e) => {
                        log::error!("Audio output init failed: {e}");
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                stream.log_on_drop(false);
                let _ = ready_tx.send(Ok(()));

                let mut sink: Option<Sink> = None;
                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Cmd::Play(path, resp) => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            let res = open_source(&path).map(|source| {
                                let s = Sink::connect_new(stream.mixer());
                                s.append(source);
                                sink = Some(s);
                            });
                            let _ = resp.send(res);
                        }
                        Cmd::Stop(resp) => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            let _ = resp.send(());
                        }
                        Cmd::IsPlaying(resp) => {
                            let playing = sink.as_ref().map(|s| !s.empty()).unwrap_or(false);
                            let _ = resp.send(playing);
                        }
                        Cmd::Shutdown => break,
                    }
                }

                drop(sink);
                drop(stream);
            })
            .map_err(|e| PlaybackError::Output(format!("spawn playback thread: {e}")))?;

        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(PlaybackError::Output(e)),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(PlaybackError::Output("audio output startup timeout".into()));
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => return Err(PlaybackError::Channel),
        }

        Ok(Self {
            cmd_tx,
            worker_handle: Some(worker_handle),
        })
    }
}

fn open_source(path: &Path) -> Result<Decoder<BufReader<File>>, PlaybackError> {
    let file = File::open(path).map_err(|source| PlaybackError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl AudioOutput for RodioOutput {
    fn play_file(&mut self, path: &Path) -> Result<(), PlaybackError> {
        let (resp_tx, resp_rx) = mpsc::channel();
        self.cmd_tx
            .send(Cmd::Play(path.to_path_buf(), resp_tx))
            .map_err(|_| PlaybackError::Channel)?;
        resp_rx.recv().map_err(|_| PlaybackError::Channel)?
    }

    fn stop(&mut self) -> Result<(), PlaybackError> {
        let (resp_tx, resp_rx) = mpsc::channel();
        self.cmd_tx
            .send(Cmd::Stop(resp_tx))
            .map_err(|_| PlaybackError::Channel)?;
        resp_rx.recv().map_err(|_| PlaybackError::Channel)
    }

    fn is_playing(&self) -> bool {
        let (resp_tx, resp_rx) = mpsc::channel();
        if self.cmd_tx.send(Cmd::IsPlaying(resp_tx)).is_err() {
            return false;
        }
        resp_rx.recv().unwrap_or(false)
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Cmd::Shutdown);
        if let Some(h) = self.worker_handle.take() {
            let _ = h.join();
        }
    }
}
