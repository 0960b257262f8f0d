//! Bench automation for characterizing PV power converters.
//!
//! A Keysight N5769A supply emulates the panel or input rail, one channel of a Keysight EL34243A
//! electronic load sinks the converter output. Three procedures run on this bench:
//!
//! - [`EfficiencySweep`]: efficiency over a grid of input voltages and load set-points.
//! - [`IvSweep`]: current-voltage characteristic of the emulated panel.
//! - [`MpptReplay`]: replay of a short-circuit current profile while the converter tracks the
//!   maximum-power point.
//!
//! A [`ShutdownGuard`] brings the bench into a safe state when a procedure ends, fails, or is
//! interrupted. Once it starts, a sweep still running on another thread can no longer reach the
//! instruments.
//!
//! # Example
//!
//! ```no_run
//! use benchbus::{DEFAULT_TIMEOUT, bus::{self, UsbtmcBus}};
//! use pvbench::{Bench, IvSweep, ShutdownGuard, SystemClock, Trigger};
//!
//! let mut usb = UsbtmcBus::default();
//! let source = bus::connect_by_idn(&mut usb, "N5769A", DEFAULT_TIMEOUT).unwrap();
//! let load = bus::connect_by_idn(&mut usb, "EL34243A", DEFAULT_TIMEOUT).unwrap();
//! let mut bench = Bench::new(source, load, 2).unwrap();
//!
//! let guard = ShutdownGuard::new();
//! guard.arm(&bench);
//! let samples = IvSweep::default().run(&mut bench, &SystemClock::new());
//! guard.shutdown(Trigger::Completion).unwrap();
//! println!("{} samples", samples.unwrap().len());
//! ```

#![deny(warnings, missing_docs)]

mod bench;
mod clock;
pub mod config;
mod error;
mod gate;
mod guard;
mod profile;
mod ramp;
mod record;
pub mod sweep;

pub use bench::Bench;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::BenchConfig;
pub use error::BenchError;
pub use gate::{CONFIRM_TOKEN, NoGate, OperatorGate, PromptGate};
pub use guard::{INTERRUPT_EXIT_CODE, SAFE_CURRENT_LIMIT, ShutdownGuard, Trigger};
pub use profile::{MpptProfile, ProfilePoint};
pub use ramp::{LinearRamp, Phase};
pub use record::{
    EFFICIENCY_UNDEFINED, EfficiencySample, IvSample, efficiency_percent, max_power_point, power,
    write_csv, write_csv_file,
};
pub use sweep::{
    EfficiencyConfig, EfficiencySweep, IvSweep, IvSweepConfig, MpptConfig, MpptReplay, MpptReport,
    SegmentReport, default_iv_voltages,
};
