//! Voice announcements.
//!
//! Phrases are spoken one at a time by a single worker thread, so a slow
//! synthesizer never holds up the countdown and overlapping announcements
//! never garble each other. Only the newest waiting phrase is spoken: when
//! the synthesizer falls behind, older announcements are already wrong and
//! are dropped. The queue is shut down explicitly at exit.
//!
//! Off Linux the system speech engine is available as [`TtsSpeaker`]; on
//! Linux an external program such as `espeak-ng` is run instead.

use std::process::{Command, Stdio};
use std::thread::JoinHandle;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use crate::error::SpeechError;

/// Something that can say a phrase out loud. Blocks until done.
pub trait Speaker: 'static {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError>;
}

/// Speaks by running an external synthesizer, e.g. `espeak-ng -v ru`, with
/// the phrase as the last argument.
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Check that the synthesizer can be launched at all.
    ///
    /// # Errors
    /// Returns `SpeechError::Init` if the program cannot be spawned.
    pub fn ensure_available(&self) -> Result<(), SpeechError> {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
            .map_err(|e| SpeechError::Init {
                program: self.program.clone(),
                message: e.to_string(),
            })
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| SpeechError::Speak(e.to_string()))?;
        if !status.success() {
            return Err(SpeechError::Speak(format!("{} exited with {status}", self.program)));
        }
        Ok(())
    }
}

/// The platform speech engine (SAPI/WinRT, AVFoundation).
///
/// The engine handle is not `Send`, so build it on the worker thread with
/// [`SpeechQueue::spawn_with`].
#[cfg(not(target_os = "linux"))]
pub struct TtsSpeaker {
    tts: tts::Tts,
}

#[cfg(not(target_os = "linux"))]
impl TtsSpeaker {
    const PROGRAM: &'static str = "system speech engine";

    /// Open the default engine at its normal rate, preferring a Russian
    /// voice when one is installed.
    ///
    /// # Errors
    /// Returns `SpeechError::Init` if the platform has no usable engine.
    pub fn new() -> Result<Self, SpeechError> {
        let mut tts = tts::Tts::default().map_err(|e| SpeechError::Init {
            program: Self::PROGRAM.to_string(),
            message: e.to_string(),
        })?;
        let _ = tts.set_rate(tts.normal_rate());
        if let Ok(voices) = tts.voices() {
            if let Some(voice) = voices
                .iter()
                .find(|v| v.language().to_string().starts_with("ru"))
            {
                let _ = tts.set_voice(voice);
            }
        }
        Ok(Self { tts })
    }
}

#[cfg(not(target_os = "linux"))]
impl Speaker for TtsSpeaker {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        self.tts
            .speak(text, false)
            .map_err(|e| SpeechError::Speak(e.to_string()))?;
        // Engines without is_speaking return immediately.
        while self.tts.is_speaking().unwrap_or(false) {
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        Ok(())
    }
}

#[derive(Debug)]
enum SpeechJob {
    Say(String),
    Stop,
}

/// Cheap handle for queueing phrases.
#[derive(Debug, Clone)]
pub struct SpeechHandle {
    tx: UnboundedSender<SpeechJob>,
}

impl SpeechHandle {
    /// Queue a phrase. Returns immediately. A phrase still waiting when a
    /// newer one arrives is never spoken.
    ///
    /// # Errors
    /// Returns `SpeechError::Closed` once the worker has stopped.
    pub fn say(&self, text: impl Into<String>) -> Result<(), SpeechError> {
        self.tx
            .send(SpeechJob::Say(text.into()))
            .map_err(|_| SpeechError::Closed)
    }
}

/// Single-worker speech queue.
#[derive(Debug)]
pub struct SpeechQueue {
    handle: SpeechHandle,
    worker: Option<JoinHandle<()>>,
}

impl SpeechQueue {
    /// Start the worker thread with a ready speaker.
    ///
    /// # Errors
    /// Returns `SpeechError::Init` if the thread cannot be spawned.
    pub fn spawn<S: Speaker + Send>(speaker: S) -> Result<Self, SpeechError> {
        let (tx, rx) = mpsc::unbounded_channel::<SpeechJob>();
        let worker = spawn_worker(move || work(speaker, rx))?;
        Ok(Self::running(tx, worker))
    }

    /// Start the worker thread and build the speaker on it. Waits until
    /// `make` has finished so that a broken engine fails here, not on the
    /// first announcement.
    ///
    /// # Errors
    /// Returns the error from `make`, or `SpeechError::Init` if the thread
    /// cannot be spawned.
    ///
    /// # Panics
    /// Panics if called from inside an async runtime, because it blocks on
    /// the worker's answer.
    pub fn spawn_with<S, F>(make: F) -> Result<Self, SpeechError>
    where
        S: Speaker,
        F: FnOnce() -> Result<S, SpeechError> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<SpeechJob>();
        let (ready_tx, ready_rx) = oneshot::channel();
        let worker = spawn_worker(move || match make() {
            Ok(speaker) => {
                let _ = ready_tx.send(Ok(()));
                work(speaker, rx);
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        })?;

        let ready = ready_rx.blocking_recv().unwrap_or(Err(SpeechError::Closed));
        if let Err(e) = ready {
            if worker.join().is_err() {
                tracing::error!("speech worker panicked");
            }
            return Err(e);
        }
        Ok(Self::running(tx, worker))
    }

    fn running(tx: UnboundedSender<SpeechJob>, worker: JoinHandle<()>) -> Self {
        Self {
            handle: SpeechHandle { tx },
            worker: Some(worker),
        }
    }

    pub fn handle(&self) -> SpeechHandle {
        self.handle.clone()
    }

    pub fn say(&self, text: impl Into<String>) -> Result<(), SpeechError> {
        self.handle.say(text)
    }

    /// Let the phrase being spoken finish, drop anything still waiting, then
    /// stop the worker and wait for it. Handles used after this fail with
    /// `Closed`.
    pub fn shutdown(&mut self) {
        let _ = self.handle.tx.send(SpeechJob::Stop);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("speech worker panicked");
            }
        }
    }
}

impl Drop for SpeechQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(body: impl FnOnce() + Send + 'static) -> Result<JoinHandle<()>, SpeechError> {
    std::thread::Builder::new()
        .name("speech".to_string())
        .spawn(body)
        .map_err(|e| SpeechError::Init {
            program: "speech worker".to_string(),
            message: e.to_string(),
        })
}

fn work<S: Speaker>(mut speaker: S, mut rx: UnboundedReceiver<SpeechJob>) {
    while let Some(SpeechJob::Say(mut text)) = rx.blocking_recv() {
        // Skip to the newest phrase; a Stop behind it wins.
        loop {
            match rx.try_recv() {
                Ok(SpeechJob::Say(newer)) => {
                    tracing::debug!(stale = %text, "dropping outdated announcement");
                    text = newer;
                }
                Ok(SpeechJob::Stop) => return,
                Err(_) => break,
            }
        }
        tracing::debug!(%text, "speaking");
        if let Err(e) = speaker.speak(&text) {
            tracing::warn!(error = %e, "announcement failed");
        }
    }
}
