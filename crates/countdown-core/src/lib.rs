//! # Countdown Core Library
//!
//! Core logic for the Countdown timer: the user picks a duration, the clock
//! ticks down once a second, a voice announces the remaining time at a fixed
//! interval, beeps sound near the end and a melody plays at zero.
//!
//! ## Architecture
//!
//! - **Precise timer**: single-shot rescheduling timer that corrects its own
//!   drift so the average tick rate stays exact
//! - **Engine**: state machine owning the remaining time; dispatches each tick
//!   to typed sinks supplied by the host
//! - **Policy**: pure decision of which notifications a tick triggers
//! - **Audio / Speech**: melody playback with an awaitable end, and a
//!   single-worker speech queue
//! - **Storage**: TOML settings file with per-field fallback to defaults
//!
//! Everything except speech runs on one thread: the host drives the engine
//! inside a tokio `LocalSet` on a current-thread runtime.
//!
//! ## Key Components
//!
//! - [`CountdownEngine`]: Countdown state machine
//! - [`PreciseTimer`]: Drift-correcting tick source
//! - [`MelodyPlayer`]: Completion melody with wait-for-end
//! - [`SettingsStore`]: Settings persistence

pub mod audio;
pub mod completion;
pub mod duration;
pub mod error;
pub mod format;
pub mod speech;
pub mod storage;
pub mod timer;

pub use audio::{AudioBackend, MelodyPlayer, SharedBackend};
pub use completion::{CompletionWorkflow, QuitSignal};
pub use duration::{EntryMode, TargetDuration};
pub use error::{ConfigError, DurationError, EngineError, PlaybackError, SpeechError};
pub use format::{seconds_to_hms, seconds_to_phrase, word_form};
pub use speech::{CommandSpeaker, Speaker, SpeechHandle, SpeechQueue};
#[cfg(not(target_os = "linux"))]
pub use speech::TtsSpeaker;
pub use storage::{Settings, SettingsStore, TimerConfiguration};
pub use timer::{
    CountdownEngine, CountdownPhase, CountdownState, NotificationPolicy, PreciseTimer, SinkKind,
    TickOutcome,
};
