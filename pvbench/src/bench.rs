use std::sync::Arc;

use benchbus::{InstrumentError, InstrumentInterface, Interlock, Interlocked};
use keysight_el34243a::{Channel, El34243a};
use keysight_n5769a::N5769a;

/// The two instruments of the test setup: a supply feeding the converter and the load channel
/// sinking its output.
///
/// Both sessions share one [`Interlock`]. After [`Bench::halt`], only the halting thread can
/// still send commands, through this bench or any clone of it.
///
/// Cloning a bench gives a second handle on the same sessions.
pub struct Bench<S: InstrumentInterface, L: InstrumentInterface> {
    /// Supply emulating the panel or input rail.
    pub source: N5769a<Interlocked<S>>,
    /// Load channel connected to the converter output.
    pub load: Channel<Interlocked<L>>,
    interlock: Arc<Interlock>,
}

impl<S: InstrumentInterface, L: InstrumentInterface> Bench<S, L> {
    /// Open the drivers on the source and load sessions and select load channel `channel`.
    pub fn new(source: S, load: L, channel: usize) -> Result<Self, InstrumentError> {
        let interlock = Interlock::new();
        let source = N5769a::try_new(Interlocked::new(source, &interlock))?;
        let mut eload = El34243a::try_new(Interlocked::new(load, &interlock))?;
        let load = eload.get_channel(channel)?;
        Ok(Self {
            source,
            load,
            interlock,
        })
    }

    /// Reserve both instruments for the calling thread for good. Commands from other threads
    /// fail with [`InstrumentError::Interlocked`] from now on.
    pub fn halt(&self) {
        self.interlock.engage();
    }

    /// Whether the bench was halted.
    pub fn is_halted(&self) -> bool {
        self.interlock.is_engaged()
    }

    /// Turn the source output and the load input off.
    pub fn power_down(&mut self) -> Result<(), InstrumentError> {
        self.source.deactivate()?;
        self.load.deactivate()
    }
}

impl<S: InstrumentInterface, L: InstrumentInterface> Clone for Bench<S, L> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            load: self.load.clone(),
            interlock: Arc::clone(&self.interlock),
        }
    }
}
