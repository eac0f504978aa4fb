//! Core error types for countdown-core.
//!
//! Every failure the countdown can hit is one of the enums below, one per
//! concern. Configuration problems degrade to defaults and are kept as
//! warnings. Sink failures reach the host's fatal-error channel.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::SinkKind;

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unregistered configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Home directory could not be prepared
    #[error("Cannot prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the countdown engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A registered sink failed while being dispatched
    #[error("{sink} sink failed: {message}")]
    Sink { sink: SinkKind, message: String },

    /// The completion sink is the only mandatory one
    #[error("No completion sink registered")]
    MissingCompletionSink,

    /// `start` called on an engine that already left `Idle`
    #[error("Countdown already started")]
    AlreadyStarted,
}

/// Completion melody errors.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Melody path not configured
    #[error("Melody file is not set")]
    EmptyPath,

    /// Melody file does not exist
    #[error("Melody file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Built without an audio backend
    #[error("Audio output is not available in this build")]
    BackendUnavailable,

    /// Output device could not be opened
    #[error("Failed to initialize audio output: {0}")]
    Init(String),

    /// File could not be read or decoded
    #[error("Failed to load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    /// The signal tone could not be emitted
    #[error("Failed to beep: {0}")]
    Beep(String),
}

/// Voice announcement errors.
#[derive(Error, Debug)]
pub enum SpeechError {
    /// Speech engine missing or broken at startup
    #[error("Failed to initialize speech engine '{program}': {message}")]
    Init { program: String, message: String },

    /// A single utterance failed
    #[error("Speech synthesis failed: {0}")]
    Speak(String),

    /// Queue already shut down
    #[error("Speech queue is closed")]
    Closed,
}

/// Duration input errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DurationError {
    /// Not of the form `A:B`
    #[error("Expected '{expected}', got '{input}'")]
    Malformed { input: String, expected: &'static str },

    /// A field outside its allowed range
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    /// Both fields empty or zero
    #[error("Duration is zero")]
    Zero,
}
