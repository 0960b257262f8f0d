//! Bringing the bench into a safe state on completion, failure, and interrupt.
//!
//! The guard holds handles on the same sessions the running sweep uses. Before its first command
//! it halts the bench, so a sweep running on another thread cannot send anything in between or
//! afterwards. Its safe-state sequence always disables the load first, so the converter is never
//! loaded while its input collapses, and only then zeroes and disables the source. The sequence
//! can run any number of times.

use std::{
    process,
    sync::{Mutex, MutexGuard},
};

use benchbus::{InstrumentError, InstrumentInterface};
use log::{debug, info, warn};
use measurements::{Current, Voltage};

use crate::Bench;

/// Current limit left on the source after shutdown, in ampere.
pub const SAFE_CURRENT_LIMIT: f64 = 0.1;

/// Exit status after an interrupt.
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// Why the bench is shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The test finished, with or without error. Control returns to the caller.
    Completion,
    /// The operator interrupted the test. The process exits afterwards.
    Interrupt,
}

/// Shuts the bench down once it has been armed.
pub struct ShutdownGuard<S: InstrumentInterface, L: InstrumentInterface> {
    bench: Mutex<Option<Bench<S, L>>>,
}

impl<S: InstrumentInterface, L: InstrumentInterface> ShutdownGuard<S, L> {
    /// Create an unarmed guard. Shutting down an unarmed guard does nothing.
    pub fn new() -> Self {
        Self {
            bench: Mutex::new(None),
        }
    }

    /// Arm the guard with handles on the bench's sessions.
    pub fn arm(&self, bench: &Bench<S, L>) {
        let mut guard = self.bench.lock().expect("Mutex should not be poisoned");
        *guard = Some(bench.clone());
    }

    /// Whether [`ShutdownGuard::arm`] was called.
    pub fn is_armed(&self) -> bool {
        self.bench
            .lock()
            .expect("Mutex should not be poisoned")
            .is_some()
    }

    /// Bring the bench into the safe state.
    ///
    /// On [`Trigger::Completion`] the result of the sequence is returned. On
    /// [`Trigger::Interrupt`] this does not return, see [`ShutdownGuard::interrupt`].
    pub fn shutdown(&self, trigger: Trigger) -> Result<(), InstrumentError> {
        match trigger {
            Trigger::Completion => self.safe_state(),
            Trigger::Interrupt => self.interrupt(),
        }
    }

    /// Bring the bench into the safe state and exit the process with [`INTERRUPT_EXIT_CODE`].
    ///
    /// The guard stays locked until the process is gone, so no other shutdown starts in between.
    pub fn interrupt(&self) -> ! {
        let (_bench, code) = self.interrupted();
        process::exit(code)
    }

    /// Run the interrupt shutdown without exiting and return the exit status for the process.
    pub fn interrupt_status(&self) -> i32 {
        self.interrupted().1
    }

    fn interrupted(&self) -> (MutexGuard<'_, Option<Bench<S, L>>>, i32) {
        let mut bench = self.bench.lock().expect("Mutex should not be poisoned");
        if let Err(err) = Self::run_sequence(&mut bench) {
            warn!("Shutdown after interrupt incomplete: {err}");
        }
        info!("Interrupted, exiting");
        (bench, INTERRUPT_EXIT_CODE)
    }

    /// Run the safe-state sequence: load input off, source voltage 0 V, source current limit
    /// [`SAFE_CURRENT_LIMIT`], source output off.
    ///
    /// The bench is halted first, see [`Bench::halt`]. Every step is attempted even if an
    /// earlier one failed. The first error is returned.
    pub fn safe_state(&self) -> Result<(), InstrumentError> {
        let mut bench = self.bench.lock().expect("Mutex should not be poisoned");
        Self::run_sequence(&mut bench)
    }

    fn run_sequence(bench: &mut Option<Bench<S, L>>) -> Result<(), InstrumentError> {
        let Some(bench) = bench.as_mut() else {
            debug!("Shutdown guard not armed, nothing to do");
            return Ok(());
        };
        bench.halt();

        let mut first_err = None;
        let mut step = |name: &str, result: Result<(), InstrumentError>| {
            if let Err(err) = result {
                warn!("Shutdown step '{name}' failed: {err}");
                first_err.get_or_insert(err);
            }
        };
        step("disable load", bench.load.deactivate());
        step(
            "zero source voltage",
            bench.source.set_voltage(Voltage::from_volts(0.0)),
        );
        step(
            "limit source current",
            bench
                .source
                .set_current(Current::from_amperes(SAFE_CURRENT_LIMIT)),
        );
        step("disable source", bench.source.deactivate());

        match first_err {
            None => {
                info!("Bench in safe state");
                Ok(())
            }
            Some(err) => Err(err),
        }
    }
}

impl<S: InstrumentInterface, L: InstrumentInterface> Default for ShutdownGuard<S, L> {
    fn default() -> Self {
        Self::new()
    }
}
