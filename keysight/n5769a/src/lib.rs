//! A rust driver for the Keysight N5769A DC power supply.
//!
//! The N5769A is a single output programmable supply. On the PV bench it emulates a panel or an
//! input rail. The driver does not cache anything: every read queries the live instrument, and
//! values out of range are rejected by the instrument itself.
//!
//! # Example
//!
//! ```no_run
//! use benchbus::{DEFAULT_TIMEOUT, bus::{self, UsbtmcBus}};
//! use keysight_n5769a::N5769a;
//! use measurements::{Current, Voltage};
//!
//! let mut usb = UsbtmcBus::default();
//! let interface = bus::connect_by_idn(&mut usb, "N5769A", DEFAULT_TIMEOUT).unwrap();
//! let mut psu = N5769a::try_new(interface).unwrap();
//!
//! psu.set_voltage(Voltage::from_volts(24.3)).unwrap();
//! psu.set_current(Current::from_amperes(4.0)).unwrap();
//! psu.activate().unwrap();
//! println!("Output voltage: {}", psu.read_voltage().unwrap());
//! ```

#![deny(warnings, missing_docs)]

use std::sync::{Arc, Mutex};

use benchbus::{InstrumentError, InstrumentInterface, parse_float};
use measurements::{Current, Voltage};

/// A rust driver for the N5769A.
///
/// Cloning the driver is cheap and clones share the same interface, so a clone can be handed to
/// a shutdown routine while the other one keeps running a sweep.
pub struct N5769a<T: InstrumentInterface> {
    interface: Arc<Mutex<T>>,
}

impl<T: InstrumentInterface> N5769a<T> {
    /// Create a new N5769A instance with the given instrument interface.
    ///
    /// # Arguments
    /// * `interface` - An instrument interface that implements the [`InstrumentInterface`] trait.
    pub fn try_new(interface: T) -> Result<Self, InstrumentError> {
        let interface = Arc::new(Mutex::new(interface));
        Ok(N5769a { interface })
    }

    /// Query the identification string of the instrument.
    pub fn get_name(&mut self) -> Result<String, InstrumentError> {
        self.query("*IDN?")
    }

    /// Set the output voltage set-point.
    pub fn set_voltage(&mut self, voltage: Voltage) -> Result<(), InstrumentError> {
        self.sendcmd(&format!(":VOLT {}", voltage.as_volts()))
    }

    /// Set the output current limit.
    pub fn set_current(&mut self, current: Current) -> Result<(), InstrumentError> {
        self.sendcmd(&format!(":CURR {}", current.as_amperes()))
    }

    /// Measure the voltage at the output.
    pub fn read_voltage(&mut self) -> Result<Voltage, InstrumentError> {
        let resp = self.query(":MEAS:VOLT?")?;
        Ok(Voltage::from_volts(parse_float(&resp)?))
    }

    /// Measure the current delivered by the output.
    pub fn read_current(&mut self) -> Result<Current, InstrumentError> {
        let resp = self.query(":MEAS:CURR?")?;
        Ok(Current::from_amperes(parse_float(&resp)?))
    }

    /// Turn the output on.
    pub fn activate(&mut self) -> Result<(), InstrumentError> {
        self.sendcmd(":OUTP ON")
    }

    /// Turn the output off.
    pub fn deactivate(&mut self) -> Result<(), InstrumentError> {
        self.sendcmd(":OUTP OFF")
    }

    /// Turn all outputs on. The N5769A has only one.
    pub fn activate_all(&mut self) -> Result<(), InstrumentError> {
        self.activate()
    }

    /// Turn all outputs off. The N5769A has only one.
    pub fn deactivate_all(&mut self) -> Result<(), InstrumentError> {
        self.deactivate()
    }

    /// Send a command to the instrument.
    fn sendcmd(&mut self, cmd: &str) -> Result<(), InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        intf.sendcmd(cmd)
    }

    /// Query the instrument with a command and return the response as a String.
    fn query(&mut self, cmd: &str) -> Result<String, InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        intf.query(cmd)
    }
}

impl<T: InstrumentInterface> Clone for N5769a<T> {
    fn clone(&self) -> Self {
        Self {
            interface: self.interface.clone(),
        }
    }
}
