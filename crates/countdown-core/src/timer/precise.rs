//! Drift-correcting periodic timer.
//!
//! A plain interval timer slips a little on every fire under load. This one
//! measures the elapsed time since start on each fire, compares it with where
//! the schedule says it should be, and shortens or lengthens the next delay by
//! the accumulated difference. Individual gaps vary; the average rate converges
//! to one fire per nominal interval.
//!
//! The first fire happens immediately and is tick 0, the reference point of
//! the schedule. Fire `n` is expected at `n * interval`.

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

/// Bookkeeping for one fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTick {
    pub tick_count: u64,
    pub nominal_interval_ms: u64,
    pub elapsed_ms_since_start: u64,
}

impl ScheduledTick {
    pub fn expected_elapsed_ms(&self) -> u64 {
        self.tick_count.saturating_mul(self.nominal_interval_ms)
    }

    /// Positive when the fire came late.
    pub fn drift_ms(&self) -> i64 {
        self.elapsed_ms_since_start as i64 - self.expected_elapsed_ms() as i64
    }

    /// Delay until the next fire, never negative.
    pub fn next_delay_ms(&self) -> u64 {
        let delay = self.nominal_interval_ms as i64 - self.drift_ms();
        delay.max(0) as u64
    }
}

/// Pure drift arithmetic, independent of any clock.
#[derive(Debug, Clone)]
pub struct DriftCorrector {
    nominal_interval_ms: u64,
    fired: u64,
}

impl DriftCorrector {
    pub fn new(nominal_interval_ms: u64) -> Self {
        Self {
            nominal_interval_ms: nominal_interval_ms.max(1),
            fired: 0,
        }
    }

    pub fn nominal_interval_ms(&self) -> u64 {
        self.nominal_interval_ms
    }

    /// Number of fires recorded so far.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Record a fire observed `elapsed_ms` after start.
    pub fn record_fire(&mut self, elapsed_ms: u64) -> ScheduledTick {
        let tick = ScheduledTick {
            tick_count: self.fired,
            nominal_interval_ms: self.nominal_interval_ms,
            elapsed_ms_since_start: elapsed_ms,
        };
        self.fired += 1;
        tick
    }

    pub fn reset(&mut self) {
        self.fired = 0;
    }
}

/// Async single-shot rescheduling timer on the tokio clock.
///
/// `tick().await` resolves once per fire. Work done between two `tick` calls
/// plays the role of the callback: the next delay is computed before it runs
/// and the sleep starts after it returns.
#[derive(Debug)]
pub struct PreciseTimer {
    corrector: DriftCorrector,
    started_at: Option<Instant>,
    next_delay: Duration,
    stopped: bool,
}

impl PreciseTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            corrector: DriftCorrector::new(interval.as_millis() as u64),
            started_at: None,
            next_delay: Duration::ZERO,
            stopped: false,
        }
    }

    /// Begin measuring from now; the first fire is immediate.
    pub fn start(&mut self) {
        self.corrector.reset();
        self.started_at = Some(Instant::now());
        self.next_delay = Duration::ZERO;
        self.stopped = false;
        tracing::debug!(
            interval_ms = self.corrector.nominal_interval_ms(),
            "precise timer started"
        );
    }

    pub fn stop(&mut self) {
        if !self.stopped {
            tracing::debug!(fired = self.corrector.fired(), "precise timer stopped");
        }
        self.stopped = true;
        self.started_at = None;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Wait for the next fire. Starts the timer if needed; returns `None`
    /// once stopped.
    pub async fn tick(&mut self) -> Option<ScheduledTick> {
        if self.stopped {
            return None;
        }
        let started_at = match self.started_at {
            Some(at) => at,
            None => {
                self.start();
                self.started_at?
            }
        };

        tokio::time::sleep(self.next_delay).await;

        let elapsed = started_at.elapsed().as_millis() as u64;
        let tick = self.corrector.record_fire(elapsed);
        self.next_delay = Duration::from_millis(tick.next_delay_ms());
        tracing::trace!(
            tick = tick.tick_count,
            drift_ms = tick.drift_ms(),
            next_delay_ms = tick.next_delay_ms(),
            "precise timer fired"
        );
        Some(tick)
    }

    /// Call `callback` on every fire until it returns `false` or the timer
    /// is stopped.
    pub async fn run<F>(&mut self, mut callback: F)
    where
        F: FnMut(&ScheduledTick) -> bool,
    {
        while let Some(tick) = self.tick().await {
            if !callback(&tick) {
                self.stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_is_signed_difference() {
        let tick = ScheduledTick {
            tick_count: 3,
            nominal_interval_ms: 1000,
            elapsed_ms_since_start: 3120,
        };
        assert_eq!(tick.expected_elapsed_ms(), 3000);
        assert_eq!(tick.drift_ms(), 120);
        assert_eq!(tick.next_delay_ms(), 880);

        let early = ScheduledTick {
            elapsed_ms_since_start: 2950,
            ..tick
        };
        assert_eq!(early.drift_ms(), -50);
        assert_eq!(early.next_delay_ms(), 1050);
    }

    #[test]
    fn late_fires_are_compensated() {
        let nominal = 1000;
        let mut corrector = DriftCorrector::new(nominal);
        let mut now = 0;
        let mut tick = corrector.record_fire(now);

        // Every requested delay is overshot by 50ms.
        for _ in 0..5 {
            now += tick.next_delay_ms() + 50;
            tick = corrector.record_fire(now);
        }
        assert_eq!(tick.tick_count, 5);

        // The sixth scheduled fire lands within one interval of 6 * nominal.
        let scheduled = now + tick.next_delay_ms();
        assert!(scheduled.abs_diff(6 * nominal) < nominal);
        assert_eq!(tick.next_delay_ms(), 950);
    }

    #[test]
    fn delay_never_negative_after_stall() {
        let mut corrector = DriftCorrector::new(1000);
        corrector.record_fire(0);
        let tick = corrector.record_fire(4_500);
        assert_eq!(tick.drift_ms(), 3_500);
        assert_eq!(tick.next_delay_ms(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn first_fire_is_immediate() {
        let mut timer = PreciseTimer::new(Duration::from_millis(1000));
        let begin = Instant::now();
        let tick = timer.tick().await.unwrap();
        assert_eq!(tick.tick_count, 0);
        assert_eq!(begin.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_callbacks_do_not_accumulate() {
        let mut timer = PreciseTimer::new(Duration::from_millis(1000));
        let begin = Instant::now();
        for _ in 0..6 {
            timer.tick().await.unwrap();
            // Simulated work inside the callback.
            tokio::time::advance(Duration::from_millis(50)).await;
        }
        let tick = timer.tick().await.unwrap();
        assert_eq!(tick.tick_count, 6);
        let elapsed = begin.elapsed().as_millis() as u64;
        assert!(elapsed.abs_diff(6000) <= 50, "elapsed {elapsed}");
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_when_callback_declines() {
        let mut timer = PreciseTimer::new(Duration::from_millis(100));
        let mut seen = Vec::new();
        timer
            .run(|tick| {
                seen.push(tick.tick_count);
                tick.tick_count < 3
            })
            .await;
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!(timer.is_stopped());
        assert!(timer.tick().await.is_none());
    }
}
