// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Elapsed-time bookkeeping
//!
//! The [`TimeSynchronizer`] is created when the handshake completes and is
//! advanced once per completed sample set. It tracks:
//!
//! - the elapsed time of the current cycle since the session origin
//!   (this is what stamps each record),
//! - a windowed counter that restarts from zero each time it reaches the
//!   configured threshold,
//! - a running total that never resets.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::debug;

use crate::config::ElapsedMode;

/// Source of monotonic time for the session
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the session.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Timing values computed for one completed cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSnapshot {
    /// Time since the session origin, used as the record timestamp
    pub cycle_elapsed: Duration,
    /// Windowed elapsed time after this cycle (zero right after a reset)
    pub window_elapsed: Duration,
    /// Windowed elapsed time before this cycle (zero right after a reset)
    pub window_previous: Duration,
    /// Running total, never reset
    pub elapsed_total: Duration,
}

/// Windowed elapsed-time counter
#[derive(Debug, Clone)]
pub struct TimeSynchronizer {
    origin: Instant,
    max_time: Duration,
    mode: ElapsedMode,
    elapsed_total: Duration,
    window_elapsed: Duration,
    window_previous: Duration,
    last_cycle_elapsed: Duration,
}

impl TimeSynchronizer {
    /// Create a synchronizer whose origin is the handshake completion time
    pub fn new(origin: Instant, max_time: Duration, mode: ElapsedMode) -> Self {
        Self {
            origin,
            max_time,
            mode,
            elapsed_total: Duration::ZERO,
            window_elapsed: Duration::ZERO,
            window_previous: Duration::ZERO,
            last_cycle_elapsed: Duration::ZERO,
        }
    }

    /// Account for a cycle completed at `now`
    pub fn advance(&mut self, now: Instant) -> TimingSnapshot {
        let cycle_elapsed = now.saturating_duration_since(self.origin);
        let delta = cycle_elapsed.saturating_sub(self.last_cycle_elapsed);

        self.window_previous = self.window_elapsed;
        self.window_elapsed += delta;
        self.elapsed_total = match self.mode {
            // Sums the time since origin of every cycle, drift included
            ElapsedMode::Legacy => self.elapsed_total + cycle_elapsed,
            ElapsedMode::WallClock => cycle_elapsed,
        };
        self.last_cycle_elapsed = cycle_elapsed;

        if self.window_elapsed >= self.max_time {
            debug!(
                "Time window of {:.3}s reached, resetting",
                self.max_time.as_secs_f64()
            );
            self.window_elapsed = Duration::ZERO;
            self.window_previous = Duration::ZERO;
        }

        TimingSnapshot {
            cycle_elapsed,
            window_elapsed: self.window_elapsed,
            window_previous: self.window_previous,
            elapsed_total: self.elapsed_total,
        }
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }

    pub fn elapsed_total(&self) -> Duration {
        self.elapsed_total
    }

    pub fn window_elapsed(&self) -> Duration {
        self.window_elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_window_resets_at_threshold() {
        let origin = Instant::now();
        let mut sync = TimeSynchronizer::new(origin, secs(10), ElapsedMode::Legacy);

        let mut total_before_reset = Duration::ZERO;
        for step in 1..=9 {
            let snapshot = sync.advance(origin + secs(step));
            assert_eq!(snapshot.window_elapsed, secs(step));
            assert_eq!(snapshot.window_previous, secs(step - 1));
            total_before_reset = snapshot.elapsed_total;
        }

        let snapshot = sync.advance(origin + secs(10));
        assert_eq!(snapshot.cycle_elapsed, secs(10));
        assert_eq!(snapshot.window_elapsed, Duration::ZERO);
        assert_eq!(snapshot.window_previous, Duration::ZERO);
        // Total keeps accumulating across the reset
        assert_eq!(snapshot.elapsed_total, total_before_reset + secs(10));

        let snapshot = sync.advance(origin + secs(11));
        assert_eq!(snapshot.window_elapsed, secs(1));
        assert_eq!(snapshot.window_previous, Duration::ZERO);
    }

    #[test]
    fn test_legacy_total_accumulates_cycle_elapsed() {
        let origin = Instant::now();
        let mut sync = TimeSynchronizer::new(origin, secs(100), ElapsedMode::Legacy);

        sync.advance(origin + secs(1));
        sync.advance(origin + secs(2));
        let snapshot = sync.advance(origin + secs(3));

        // 1 + 2 + 3
        assert_eq!(snapshot.elapsed_total, secs(6));
        assert_eq!(snapshot.cycle_elapsed, secs(3));
    }

    #[test]
    fn test_wall_clock_total_tracks_origin() {
        let origin = Instant::now();
        let mut sync = TimeSynchronizer::new(origin, secs(100), ElapsedMode::WallClock);

        sync.advance(origin + secs(1));
        sync.advance(origin + secs(2));
        let snapshot = sync.advance(origin + secs(3));

        assert_eq!(snapshot.elapsed_total, secs(3));
    }

    #[test]
    fn test_window_overshoot_resets() {
        let origin = Instant::now();
        let mut sync = TimeSynchronizer::new(origin, secs(10), ElapsedMode::Legacy);

        sync.advance(origin + secs(7));
        let snapshot = sync.advance(origin + secs(14));
        assert_eq!(snapshot.window_elapsed, Duration::ZERO);
        assert_eq!(sync.window_elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        let start = clock.now();

        handle.advance(Duration::from_millis(1500));
        assert_eq!(clock.now() - start, Duration::from_millis(1500));
    }
}
