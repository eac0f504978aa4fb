mod engine;
mod policy;
mod precise;

pub use engine::{
    CountdownEngine, CountdownPhase, CountdownState, SinkError, SinkKind, SinkResult, TickOutcome,
    DISPATCH_ERROR_TITLE, TICK_INTERVAL,
};
pub use policy::{NotificationPolicy, TickDecision};
pub use precise::{DriftCorrector, PreciseTimer, ScheduledTick};
