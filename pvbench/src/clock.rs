//! Wall clock used for settle delays and time-driven ramps.

use std::{
    cell::Cell,
    thread,
    time::{Duration, Instant},
};

/// A source of elapsed time that can also wait.
pub trait Clock {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Block for the given duration.
    fn sleep(&self, duration: Duration);

    /// Time elapsed since an earlier reading of [`Clock::now`].
    fn since(&self, start: Duration) -> Duration {
        self.now().saturating_sub(start)
    }
}

/// The real wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Start a new clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// A clock that only moves when slept on or advanced by hand.
///
/// Timed loops driven by a `ManualClock` run instantly and always take the same path, which makes
/// them easy to test.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    /// Create a manual clock standing at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new();
        assert_eq!(Duration::ZERO, clock.now());
        clock.sleep(Duration::from_millis(100));
        let start = clock.now();
        clock.advance(Duration::from_millis(250));
        assert_eq!(Duration::from_millis(350), clock.now());
        assert_eq!(Duration::from_millis(250), clock.since(start));
    }

    #[test]
    fn test_system_clock_moves() {
        let clock = SystemClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_millis(5));
        assert!(clock.since(start) >= Duration::from_millis(5));
    }
}
