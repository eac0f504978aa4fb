//! Countdown engine.
//!
//! The engine owns the remaining time and the precise timer driving it. Each
//! tick runs a fixed pipeline against the sinks the host registered:
//!
//! ```text
//! decrement -> display -> completion? -> voice -> beep
//! ```
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Completed
//!            \-----> Halted      (a sink failed)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = CountdownEngine::new(config);
//! engine.register_display_sink(|s| { println!("{s}"); Ok(()) });
//! engine.register_completion_sink(|| Ok(()));
//! engine.start(90)?;
//! engine.run().await;
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use super::policy::{NotificationPolicy, TickDecision};
use super::precise::PreciseTimer;
use crate::error::EngineError;
use crate::storage::TimerConfiguration;

/// Nominal period between countdown ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Title used on the fatal-error channel for sink failures.
pub const DISPATCH_ERROR_TITLE: &str = "Countdown stopped";

/// Error type sinks may return.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;
pub type SinkResult = Result<(), SinkError>;

type SecondsSink = Box<dyn FnMut(u64) -> SinkResult>;
type CompletionSink = Box<dyn FnMut() -> SinkResult>;
type FatalChannel = Box<dyn FnMut(&str, &str)>;

/// The fixed set of sinks the engine dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Display,
    Voice,
    Beep,
    Completion,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SinkKind::Display => "display",
            SinkKind::Voice => "voice",
            SinkKind::Beep => "beep",
            SinkKind::Completion => "completion",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownPhase {
    Idle,
    Running,
    Completed,
    /// A sink failed; terminal.
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownState {
    pub seconds_remaining: u64,
    pub phase: CountdownPhase,
}

impl CountdownState {
    pub fn is_running(&self) -> bool {
        self.phase == CountdownPhase::Running
    }
}

/// Result of handling one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The engine was not running; nothing happened.
    Ignored,
    Continued(TickDecision),
    Completed,
    Halted(SinkKind),
}

#[derive(Default)]
struct Sinks {
    display: Option<SecondsSink>,
    voice: Option<SecondsSink>,
    beep: Option<SecondsSink>,
    completion: Option<CompletionSink>,
    fatal: Option<FatalChannel>,
}

/// Core countdown state machine.
pub struct CountdownEngine {
    config: TimerConfiguration,
    policy: NotificationPolicy,
    state: CountdownState,
    timer: PreciseTimer,
    sinks: Sinks,
}

impl CountdownEngine {
    /// Create an idle engine. The configuration is copied and stays fixed for
    /// the whole countdown.
    pub fn new(config: TimerConfiguration) -> Self {
        Self::with_tick_interval(config, TICK_INTERVAL)
    }

    pub fn with_tick_interval(config: TimerConfiguration, interval: Duration) -> Self {
        let policy = NotificationPolicy::from_config(&config);
        Self {
            config,
            policy,
            state: CountdownState {
                seconds_remaining: 0,
                phase: CountdownPhase::Idle,
            },
            timer: PreciseTimer::new(interval),
            sinks: Sinks::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> CountdownState {
        self.state
    }

    pub fn phase(&self) -> CountdownPhase {
        self.state.phase
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.state.seconds_remaining
    }

    pub fn config(&self) -> &TimerConfiguration {
        &self.config
    }

    // ── Sink registration ────────────────────────────────────────────

    pub fn register_display_sink<F>(&mut self, sink: F) -> &mut Self
    where
        F: FnMut(u64) -> SinkResult + 'static,
    {
        self.sinks.display = Some(Box::new(sink));
        self
    }

    pub fn register_voice_sink<F>(&mut self, sink: F) -> &mut Self
    where
        F: FnMut(u64) -> SinkResult + 'static,
    {
        self.sinks.voice = Some(Box::new(sink));
        self
    }

    pub fn register_beep_sink<F>(&mut self, sink: F) -> &mut Self
    where
        F: FnMut(u64) -> SinkResult + 'static,
    {
        self.sinks.beep = Some(Box::new(sink));
        self
    }

    /// Mandatory: `start` refuses to run without it.
    pub fn register_completion_sink<F>(&mut self, sink: F) -> &mut Self
    where
        F: FnMut() -> SinkResult + 'static,
    {
        self.sinks.completion = Some(Box::new(sink));
        self
    }

    /// Receives `(title, message)` for every unrecoverable failure.
    pub fn register_fatal_channel<F>(&mut self, channel: F) -> &mut Self
    where
        F: FnMut(&str, &str) + 'static,
    {
        self.sinks.fatal = Some(Box::new(channel));
        self
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, initial_seconds: u64) -> Result<(), EngineError> {
        if self.state.phase != CountdownPhase::Idle {
            return Err(EngineError::AlreadyStarted);
        }
        if self.sinks.completion.is_none() {
            return Err(EngineError::MissingCompletionSink);
        }
        self.state = CountdownState {
            seconds_remaining: initial_seconds,
            phase: CountdownPhase::Running,
        };
        self.timer.start();
        tracing::info!(
            seconds = initial_seconds,
            voice_interval = self.config.voice_interval_seconds,
            beep_interval = self.config.beep_interval_seconds,
            final_window = self.config.final_window_seconds,
            "countdown started"
        );
        Ok(())
    }

    /// Handle one scheduler tick.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.is_running() {
            return TickOutcome::Ignored;
        }

        let remaining = self.state.seconds_remaining.saturating_sub(1);
        self.state.seconds_remaining = remaining;
        tracing::debug!(remaining, "tick");

        if let Err(err) = self.dispatch_seconds(SinkKind::Display, remaining) {
            return self.halt(err);
        }

        let decision = self.policy.decide(remaining);
        if decision.complete {
            return self.complete();
        }
        if decision.announce_voice {
            if let Err(err) = self.dispatch_seconds(SinkKind::Voice, remaining) {
                return self.halt(err);
            }
        }
        if decision.beep {
            if let Err(err) = self.dispatch_seconds(SinkKind::Beep, remaining) {
                return self.halt(err);
            }
        }
        TickOutcome::Continued(decision)
    }

    /// Drive the countdown from the precise timer until it completes or
    /// halts. Tick 0 fires immediately and only publishes the starting value.
    pub async fn run(&mut self) -> CountdownPhase {
        while self.state.is_running() {
            let Some(tick) = self.timer.tick().await else {
                break;
            };
            if tick.tick_count == 0 {
                let initial = self.state.seconds_remaining;
                if let Err(err) = self.dispatch_seconds(SinkKind::Display, initial) {
                    self.halt(err);
                }
                continue;
            }
            self.tick();
        }
        self.timer.stop();
        self.state.phase
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn dispatch_seconds(&mut self, kind: SinkKind, seconds: u64) -> Result<(), EngineError> {
        let sink = match kind {
            SinkKind::Display => self.sinks.display.as_mut(),
            SinkKind::Voice => self.sinks.voice.as_mut(),
            SinkKind::Beep => self.sinks.beep.as_mut(),
            SinkKind::Completion => None,
        };
        match sink {
            Some(sink) => sink(seconds).map_err(|err| EngineError::Sink {
                sink: kind,
                message: err.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn complete(&mut self) -> TickOutcome {
        self.state.phase = CountdownPhase::Completed;
        self.timer.stop();
        tracing::info!("countdown completed");

        let result = match self.sinks.completion.as_mut() {
            Some(sink) => sink(),
            None => Err("completion sink missing".into()),
        };
        match result {
            Ok(()) => TickOutcome::Completed,
            Err(err) => self.halt(EngineError::Sink {
                sink: SinkKind::Completion,
                message: err.to_string(),
            }),
        }
    }

    fn halt(&mut self, err: EngineError) -> TickOutcome {
        let sink = match &err {
            EngineError::Sink { sink, .. } => *sink,
            _ => SinkKind::Completion,
        };
        self.state.phase = CountdownPhase::Halted;
        self.timer.stop();

        let message = err.to_string();
        tracing::error!(%sink, %message, "countdown halted");
        if let Some(fatal) = self.sinks.fatal.as_mut() {
            fatal(DISPATCH_ERROR_TITLE, &message);
        }
        TickOutcome::Halted(sink)
    }
}

impl fmt::Debug for CountdownEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn config() -> TimerConfiguration {
        TimerConfiguration {
            voice_interval_seconds: 10,
            beep_interval_seconds: 3,
            final_window_seconds: 11,
            completion_melody_path: "done.mp3".into(),
        }
    }

    #[derive(Default)]
    struct Log {
        display: Vec<u64>,
        voice: Vec<u64>,
        beep: Vec<u64>,
        completed: u32,
        fatal: Vec<(String, String)>,
    }

    fn wired(log: &Rc<RefCell<Log>>) -> CountdownEngine {
        let mut engine = CountdownEngine::new(config());
        let l = log.clone();
        engine.register_display_sink(move |s| {
            l.borrow_mut().display.push(s);
            Ok(())
        });
        let l = log.clone();
        engine.register_voice_sink(move |s| {
            l.borrow_mut().voice.push(s);
            Ok(())
        });
        let l = log.clone();
        engine.register_beep_sink(move |s| {
            l.borrow_mut().beep.push(s);
            Ok(())
        });
        let l = log.clone();
        engine.register_completion_sink(move || {
            l.borrow_mut().completed += 1;
            Ok(())
        });
        let l = log.clone();
        engine.register_fatal_channel(move |title, message| {
            l.borrow_mut().fatal.push((title.into(), message.into()));
        });
        engine
    }

    #[test]
    fn two_ticks_complete_a_two_second_countdown() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = wired(&log);
        engine.start(2).unwrap();

        assert!(matches!(engine.tick(), TickOutcome::Continued(_)));
        assert_eq!(engine.tick(), TickOutcome::Completed);
        assert_eq!(engine.tick(), TickOutcome::Ignored);

        let log = log.borrow();
        assert_eq!(log.display, vec![1, 0]);
        assert_eq!(log.completed, 1);
        assert_eq!(engine.phase(), CountdownPhase::Completed);
        assert_eq!(engine.seconds_remaining(), 0);
    }

    #[test]
    fn completion_skips_voice_and_beep() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = wired(&log);
        engine.start(1).unwrap();
        assert_eq!(engine.tick(), TickOutcome::Completed);

        let log = log.borrow();
        assert!(log.voice.is_empty());
        assert!(log.beep.is_empty());
    }

    #[test]
    fn voice_and_beep_follow_policy() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = wired(&log);
        engine.start(21).unwrap();
        for _ in 0..21 {
            engine.tick();
        }

        let log = log.borrow();
        assert_eq!(log.voice, vec![20, 10]);
        assert_eq!(log.beep, vec![9, 6, 3]);
        assert_eq!(log.completed, 1);
        assert_eq!(log.display.len(), 21);
    }

    #[test]
    fn failing_display_sink_halts_before_voice() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = wired(&log);
        engine.register_display_sink(|_| Err("screen gone".into()));
        engine.start(11).unwrap();

        assert_eq!(engine.tick(), TickOutcome::Halted(SinkKind::Display));
        assert_eq!(engine.tick(), TickOutcome::Ignored);

        let log = log.borrow();
        assert_eq!(log.fatal.len(), 1);
        assert_eq!(log.fatal[0].0, DISPATCH_ERROR_TITLE);
        assert!(log.fatal[0].1.contains("display"));
        assert!(log.fatal[0].1.contains("screen gone"));
        assert!(log.voice.is_empty());
        assert!(log.beep.is_empty());
        assert_eq!(log.completed, 0);
        assert_eq!(engine.phase(), CountdownPhase::Halted);
    }

    #[test]
    fn failing_completion_sink_is_reported() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = wired(&log);
        engine.register_completion_sink(|| Err("no speakers".into()));
        engine.start(1).unwrap();

        assert_eq!(engine.tick(), TickOutcome::Halted(SinkKind::Completion));
        assert_eq!(log.borrow().fatal.len(), 1);
    }

    #[test]
    fn start_requires_completion_sink() {
        let mut engine = CountdownEngine::new(config());
        assert!(matches!(
            engine.start(5),
            Err(EngineError::MissingCompletionSink)
        ));
        assert_eq!(engine.phase(), CountdownPhase::Idle);
    }

    #[test]
    fn start_twice_is_rejected() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = wired(&log);
        engine.start(5).unwrap();
        assert!(matches!(engine.start(5), Err(EngineError::AlreadyStarted)));
    }

    #[test]
    fn unregistered_optional_sinks_are_no_ops() {
        let mut engine = CountdownEngine::new(config());
        engine.register_completion_sink(|| Ok(()));
        engine.start(10).unwrap();
        assert!(matches!(engine.tick(), TickOutcome::Continued(_)));
    }

    #[test]
    fn idle_engine_ignores_ticks() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = wired(&log);
        assert_eq!(engine.tick(), TickOutcome::Ignored);
        assert!(log.borrow().display.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_counts_down_in_real_seconds() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = wired(&log);
        engine.start(3).unwrap();

        let begin = tokio::time::Instant::now();
        let phase = engine.run().await;

        assert_eq!(phase, CountdownPhase::Completed);
        assert_eq!(begin.elapsed(), Duration::from_secs(3));
        let log = log.borrow();
        assert_eq!(log.display, vec![3, 2, 1, 0]);
        assert_eq!(log.completed, 1);
    }
}
