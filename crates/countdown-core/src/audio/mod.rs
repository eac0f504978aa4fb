//! Audio output: end-of-countdown beeps and the completion melody.

mod bell;
#[cfg(feature = "audio")]
mod rodio_backend;

pub use bell::TerminalBell;
#[cfg(feature = "audio")]
pub use rodio_backend::RodioBackend;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use tokio::time::{Duration, MissedTickBehavior};

use crate::error::PlaybackError;
use crate::timer::SinkResult;

/// How often playback status is polled while waiting for the melody.
pub const PLAYBACK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A sound output device.
pub trait AudioBackend {
    /// Open the output. Calling it again is a no-op.
    fn init(&mut self) -> Result<(), PlaybackError>;

    /// Start playing a file; returns once playback has begun.
    fn play_file(&mut self, path: &Path) -> Result<(), PlaybackError>;

    /// Whether the last started file is still playing.
    fn is_playing(&self) -> bool;

    /// A short signal tone.
    fn beep(&mut self) -> Result<(), PlaybackError>;
}

/// Backend shared between the beep sink and the melody player on the
/// countdown's thread.
pub type SharedBackend = Rc<RefCell<dyn AudioBackend>>;

/// The best backend this build supports.
#[cfg(feature = "audio")]
pub fn default_backend() -> SharedBackend {
    Rc::new(RefCell::new(RodioBackend::new()))
}

/// The best backend this build supports.
#[cfg(not(feature = "audio"))]
pub fn default_backend() -> SharedBackend {
    Rc::new(RefCell::new(TerminalBell::new()))
}

/// Beep sink for the engine. A beep that cannot be played is logged and
/// skipped; it never stops the countdown.
pub fn beep_sink(backend: SharedBackend) -> impl FnMut(u64) -> SinkResult + 'static {
    move |remaining| {
        if let Err(e) = backend.borrow_mut().beep() {
            tracing::warn!(error = %e, remaining, "beep failed");
        }
        Ok(())
    }
}

/// Plays the completion melody and resolves when it has finished.
///
/// Waiting polls the backend on the tokio clock, so the thread keeps serving
/// other tasks meanwhile. Dropping the future abandons the wait.
#[derive(Clone)]
pub struct MelodyPlayer {
    backend: SharedBackend,
    poll_interval: Duration,
}

impl MelodyPlayer {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            poll_interval: PLAYBACK_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Play `path` and wait for the end of playback.
    ///
    /// # Errors
    /// Fails when the path is empty or missing, or when the backend cannot
    /// be opened or cannot load the file.
    pub async fn play_and_wait(&self, path: &str) -> Result<(), PlaybackError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(PlaybackError::EmptyPath);
        }
        let path = Path::new(path);
        if !path.is_file() {
            return Err(PlaybackError::NotFound(path.to_path_buf()));
        }

        {
            let mut backend = self.backend.borrow_mut();
            backend.init()?;
            backend.play_file(path)?;
        }
        tracing::info!(path = %path.display(), "melody playing");

        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            poll.tick().await;
            if !self.backend.borrow().is_playing() {
                break;
            }
        }
        tracing::info!("melody finished");
        Ok(())
    }
}
