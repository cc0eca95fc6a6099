//! Dedicated audio output thread for the cloud adapter.
//!
//! `rodio::OutputStream` is `!Send` on some platforms. It is confined to one
//! OS thread and driven through [`AudioCommand`]s; [`RodioSink`] is the
//! `Send + Sync` proxy the async side holds.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use async_trait::async_trait;
use debate_core::SynthesizedAudio;
use rodio::{Decoder, OutputStream, Sink};
use tokio::sync::oneshot;

use crate::cloud::AudioSink;
use crate::error::VoiceError;

// ── Commands ───────────────────────────────────────────────────────

enum AudioCommand {
    /// Decode and play; `done` fires with `Ok` when the sink drains and
    /// with `Cancelled` when it is stopped first.
    Play {
        bytes: Vec<u8>,
        done: oneshot::Sender<Result<(), VoiceError>>,
    },

    /// Stop current playback (fire-and-forget).
    Stop,

    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// Audio output through rodio on the default device.
pub struct RodioSink {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RodioSink {
    /// Spawn the audio thread and open the default output device.
    ///
    /// Device errors are reported back through a one-shot init channel.
    pub fn spawn() -> Result<Self, VoiceError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), VoiceError>>();

        let thread = thread::Builder::new()
            .name("debate-audio".into())
            .spawn(move || run(&cmd_rx, &init_tx))
            .map_err(|e| {
                VoiceError::OutputStreamError(format!("failed to spawn audio thread: {e}"))
            })?;

        init_rx.recv().map_err(|_| VoiceError::AudioThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }
}

#[async_trait]
impl AudioSink for RodioSink {
    fn is_available(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    async fn play(&self, audio: SynthesizedAudio) -> Result<(), VoiceError> {
        let (done, rx) = oneshot::channel();
        self.cmd_tx
            .send(AudioCommand::Play {
                bytes: audio.bytes,
                done,
            })
            .map_err(|_| VoiceError::AudioThreadDied)?;
        rx.await.map_err(|_| VoiceError::AudioThreadDied)?
    }

    fn stop(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Stop);
    }
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

// ── Audio thread event loop ────────────────────────────────────────

/// The clip currently in the sink.
struct Playing {
    sink: Arc<Sink>,
    stopped: Arc<AtomicBool>,
}

impl Playing {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.sink.stop();
    }
}

/// Result reported once the sink stops sounding.
fn outcome(stopped: &AtomicBool) -> Result<(), VoiceError> {
    if stopped.load(Ordering::SeqCst) {
        Err(VoiceError::Cancelled)
    } else {
        Ok(())
    }
}

fn run(cmd_rx: &mpsc::Receiver<AudioCommand>, init_tx: &mpsc::Sender<Result<(), VoiceError>>) {
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = init_tx.send(Err(VoiceError::OutputStreamError(e.to_string())));
            return;
        }
    };
    if init_tx.send(Ok(())).is_err() {
        return;
    }
    tracing::info!("Audio playback initialized on default output device");

    let mut current: Option<Playing> = None;

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            AudioCommand::Play { bytes, done } => {
                if let Some(playing) = current.take() {
                    playing.stop();
                }

                let source = match Decoder::new(Cursor::new(bytes)) {
                    Ok(source) => source,
                    Err(e) => {
                        let _ = done.send(Err(VoiceError::PlaybackError(e.to_string())));
                        continue;
                    }
                };
                let sink = match Sink::try_new(&stream_handle) {
                    Ok(sink) => Arc::new(sink),
                    Err(e) => {
                        let _ = done.send(Err(VoiceError::OutputStreamError(e.to_string())));
                        continue;
                    }
                };
                sink.append(source);
                tracing::debug!("Audio playback started");

                // `sleep_until_end` returns on drain or after `stop()`.
                let stopped = Arc::new(AtomicBool::new(false));
                let watched = Arc::clone(&sink);
                let flag = Arc::clone(&stopped);
                thread::spawn(move || {
                    watched.sleep_until_end();
                    let _ = done.send(outcome(&flag));
                });
                current = Some(Playing { sink, stopped });
            }

            AudioCommand::Stop => {
                if let Some(playing) = current.take() {
                    playing.stop();
                    tracing::debug!("Audio playback stopped");
                }
            }

            AudioCommand::Shutdown => break,
        }
    }

    if let Some(playing) = current.take() {
        playing.stop();
    }
    tracing::debug!("Audio thread shutting down");
}
