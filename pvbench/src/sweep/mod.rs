//! The bench test procedures.
//!
//! Every procedure starts from the bench powered down, selects the regulation mode of the load
//! once, and then walks its plan of set-points, waiting on the [`Clock`](crate::Clock) around
//! every change before it reads samples back.

mod efficiency;
mod iv;
mod mppt;

pub use efficiency::{EfficiencyConfig, EfficiencySweep};
pub use iv::{IvSweep, IvSweepConfig, default_iv_voltages};
pub use mppt::{MpptConfig, MpptReplay, MpptReport, SegmentReport};

use std::time::Duration;

/// Seconds from a configuration file as a duration. Negative or invalid values wait zero.
pub(crate) fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs() {
        assert_eq!(Duration::from_millis(100), secs(0.1));
        assert_eq!(Duration::ZERO, secs(-1.0));
        assert_eq!(Duration::ZERO, secs(f64::NAN));
    }
}
