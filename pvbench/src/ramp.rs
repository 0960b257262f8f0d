//! Linear set-point ramps driven by elapsed time.
//!
//! A ramp moves a set-point from a start value to an end value over a time window. Polling it with
//! the current elapsed time yields the state it is in: still [`Phase::Ramping`] with the value to
//! apply right now, or [`Phase::Holding`] the end value once the window has passed.

use std::time::Duration;

/// State of a ramp at a given time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// The window is still open, apply this value and poll again.
    Ramping(f64),
    /// The window has passed, the end value holds from now on.
    Holding(f64),
}

impl Phase {
    /// The set-point of this phase.
    pub fn value(&self) -> f64 {
        match self {
            Phase::Ramping(value) | Phase::Holding(value) => *value,
        }
    }
}

/// A linear ramp between `(t_start, start)` and `(t_end, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRamp {
    t_start: Duration,
    t_end: Duration,
    start: f64,
    end: f64,
}

impl LinearRamp {
    /// Create a new ramp. A window with `t_end <= t_start` holds `end` right away.
    pub fn new(t_start: Duration, t_end: Duration, start: f64, end: f64) -> Self {
        Self {
            t_start,
            t_end,
            start,
            end,
        }
    }

    /// The value the ramp ends on.
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Interpolated set-point at elapsed time `t`, clamped to the end points outside the window.
    pub fn value_at(&self, t: Duration) -> f64 {
        if self.t_end <= self.t_start || t >= self.t_end {
            return self.end;
        }
        if t <= self.t_start {
            return self.start;
        }
        let frac = (t - self.t_start).as_secs_f64() / (self.t_end - self.t_start).as_secs_f64();
        self.start + (self.end - self.start) * frac
    }

    /// Phase of the ramp at elapsed time `t`.
    pub fn phase_at(&self, t: Duration) -> Phase {
        if t < self.t_end && self.t_start < self.t_end {
            Phase::Ramping(self.value_at(t))
        } else {
            Phase::Holding(self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    /// Profile step from (1 s, 0.2 Isc) to (3 s, 0.8 Isc) with Isc = 5.21 A.
    #[fixture]
    fn profile_ramp() -> LinearRamp {
        LinearRamp::new(secs(1.0), secs(3.0), 0.2 * 5.21, 0.8 * 5.21)
    }

    #[rstest]
    fn test_value_midway(profile_ramp: LinearRamp) {
        let exp = 1.042 + (4.168 - 1.042) * (2.0 - 1.0) / (3.0 - 1.0);
        assert!((profile_ramp.value_at(secs(2.0)) - exp).abs() < 1e-9);
    }

    #[rstest]
    #[case(0.0, 1.042)]
    #[case(1.0, 1.042)]
    #[case(1.5, 1.8235)]
    #[case(2.5, 3.3865)]
    #[case(3.0, 4.168)]
    #[case(10.0, 4.168)]
    fn test_value_at(profile_ramp: LinearRamp, #[case] t: f64, #[case] exp: f64) {
        assert!((profile_ramp.value_at(secs(t)) - exp).abs() < 1e-9);
    }

    #[rstest]
    fn test_monotonic(profile_ramp: LinearRamp) {
        let values: Vec<f64> = (0..=40)
            .map(|ms| profile_ramp.value_at(Duration::from_millis(ms * 100)))
            .collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));

        let down = LinearRamp::new(secs(0.0), secs(1.0), 5.0, 1.0);
        let values: Vec<f64> = (0..=10)
            .map(|ms| down.value_at(Duration::from_millis(ms * 100)))
            .collect();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        assert!(values.iter().all(|v| (1.0..=5.0).contains(v)));
    }

    #[rstest]
    fn test_phase(profile_ramp: LinearRamp) {
        assert!(matches!(profile_ramp.phase_at(secs(2.0)), Phase::Ramping(_)));
        assert_eq!(Phase::Holding(0.8 * 5.21), profile_ramp.phase_at(secs(3.0)));
        assert_eq!(Phase::Holding(0.8 * 5.21), profile_ramp.phase_at(secs(3.5)));
        assert_eq!(0.8 * 5.21, profile_ramp.end());
    }

    #[rstest]
    fn test_degenerate_window() {
        let ramp = LinearRamp::new(secs(2.0), secs(2.0), 1.0, 3.0);
        assert_eq!(Phase::Holding(3.0), ramp.phase_at(secs(0.0)));
        assert_eq!(3.0, ramp.value_at(secs(1.0)));
    }
}
