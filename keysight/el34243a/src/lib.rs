//! A rust driver for the Keysight EL34243A dual channel electronic load.
//!
//! Each channel of the load regulates in one of four modes: constant current, resistance,
//! power, or voltage. The mode has to be selected with [`Channel::set_mode`] before any
//! set-point or slew rate is sent to that channel, since these commands live in the namespace of
//! the selected mode. Channels are numbered starting at 1, as on the front panel.
//!
//! # Example
//!
//! ```no_run
//! use benchbus::{DEFAULT_TIMEOUT, bus::{self, UsbtmcBus}};
//! use keysight_el34243a::{El34243a, RegulationMode};
//!
//! let mut usb = UsbtmcBus::default();
//! let interface = bus::connect_by_idn(&mut usb, "EL34243A", DEFAULT_TIMEOUT).unwrap();
//! let mut eload = El34243a::try_new(interface).unwrap();
//!
//! // Sink 4 A on channel 2, sensing at the device under test.
//! let mut ch2 = eload.get_channel(2).unwrap();
//! ch2.set_mode(RegulationMode::Current, true).unwrap();
//! ch2.set_value(4.0).unwrap();
//! ch2.activate().unwrap();
//! println!("Power sunk: {}", ch2.read_power().unwrap());
//! eload.deactivate_all().unwrap();
//! ```

#![deny(warnings, missing_docs)]

mod mode;

pub use mode::{RegulationMode, SenseSource};

use std::sync::{Arc, Mutex};

use benchbus::{InstrumentError, InstrumentInterface, parse_float};
use measurements::{Current, Power, Voltage};

use mode::ChannelState;

/// A rust driver for the EL34243A.
///
/// The driver keeps the regulation mode and sense source of every channel. This state is shared
/// between clones of the driver and all channels created from it.
pub struct El34243a<T: InstrumentInterface> {
    interface: Arc<Mutex<T>>,
    channels: Arc<Mutex<Vec<ChannelState>>>,
}

impl<T: InstrumentInterface> El34243a<T> {
    /// Create a new EL34243A instance with its two channels.
    ///
    /// # Arguments
    /// * `interface` - An instrument interface that implements the [`InstrumentInterface`] trait.
    pub fn try_new(interface: T) -> Result<Self, InstrumentError> {
        Self::with_channels(interface, 2)
    }

    /// Create a new instance for a load with the given number of channels.
    ///
    /// The channel count is fixed for the lifetime of the driver.
    pub fn with_channels(interface: T, num_channels: usize) -> Result<Self, InstrumentError> {
        if num_channels == 0 {
            return Err(InstrumentError::InvalidArgument(
                "A load needs at least one channel".to_string(),
            ));
        }
        Ok(El34243a {
            interface: Arc::new(Mutex::new(interface)),
            channels: Arc::new(Mutex::new(vec![ChannelState::default(); num_channels])),
        })
    }

    /// Number of channels of this load.
    pub fn num_channels(&self) -> usize {
        self.channels
            .lock()
            .expect("Mutex should not be poisoned")
            .len()
    }

    /// Get the channel with the given number.
    ///
    /// Please note that channels are one-indexed.
    pub fn get_channel(&mut self, num: usize) -> Result<Channel<T>, InstrumentError> {
        let nof_channels = self.num_channels();
        if num == 0 || num > nof_channels {
            return Err(InstrumentError::ChannelIndexOutOfRange {
                idx: num,
                nof_channels,
            });
        }
        Ok(Channel::new(
            num,
            Arc::clone(&self.interface),
            Arc::clone(&self.channels),
        ))
    }

    /// Query the identification string of the instrument.
    pub fn get_name(&mut self) -> Result<String, InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        intf.query("*IDN?")
    }

    /// Turn the inputs of all channels on, in ascending order.
    ///
    /// Every channel is attempted even if an earlier one failed. The first error is returned.
    pub fn activate_all(&mut self) -> Result<(), InstrumentError> {
        self.for_all_channels(|ch| ch.activate())
    }

    /// Turn the inputs of all channels off, in ascending order.
    ///
    /// Every channel is attempted even if an earlier one failed. The first error is returned.
    pub fn deactivate_all(&mut self) -> Result<(), InstrumentError> {
        self.for_all_channels(|ch| ch.deactivate())
    }

    fn for_all_channels<F>(&mut self, mut op: F) -> Result<(), InstrumentError>
    where
        F: FnMut(&mut Channel<T>) -> Result<(), InstrumentError>,
    {
        let mut first_err = None;
        for num in 1..=self.num_channels() {
            let mut ch = self.get_channel(num)?;
            if let Err(err) = op(&mut ch) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl<T: InstrumentInterface> Clone for El34243a<T> {
    fn clone(&self) -> Self {
        Self {
            interface: self.interface.clone(),
            channels: self.channels.clone(),
        }
    }
}

/// Channel structure representing a single input channel of the EL34243A.
///
/// **This structure can only be created through the [`El34243a`] struct.**
pub struct Channel<T: InstrumentInterface> {
    num: usize,
    interface: Arc<Mutex<T>>,
    channels: Arc<Mutex<Vec<ChannelState>>>,
}

impl<T: InstrumentInterface> Channel<T> {
    /// Get a new channel for the given instrument interface.
    ///
    /// This function can only be called from inside of the [`El34243a`] struct.
    fn new(num: usize, interface: Arc<Mutex<T>>, channels: Arc<Mutex<Vec<ChannelState>>>) -> Self {
        Channel {
            num,
            interface,
            channels,
        }
    }

    /// The one-based number of this channel.
    pub fn number(&self) -> usize {
        self.num
    }

    /// The regulation mode last selected on this channel, if any.
    pub fn mode(&self) -> Option<RegulationMode> {
        self.state().mode
    }

    /// The sense source last selected on this channel.
    pub fn sense(&self) -> SenseSource {
        self.state().sense
    }

    /// Select the regulation mode and the voltage sense source of this channel.
    ///
    /// # Arguments
    /// * `mode` - Regulation mode, also used as namespace for later set-points.
    /// * `remote_sense` - Sense at the remote sense terminals if `true`, internally otherwise.
    pub fn set_mode(
        &mut self,
        mode: RegulationMode,
        remote_sense: bool,
    ) -> Result<(), InstrumentError> {
        let sense = SenseSource::from(remote_sense);
        self.sendcmd(&format!("FUNC {mode}"))?;
        self.update_state(|state| state.mode = Some(mode));
        self.sendcmd(&format!("VOLT:SENS:SOUR {}", sense.as_str()))?;
        self.update_state(|state| state.sense = sense);
        Ok(())
    }

    /// Set the set-point of the selected regulation mode.
    ///
    /// The value is in the unit of the mode, see [`RegulationMode::unit`]. Fails with
    /// [`InstrumentError::ModeNotSet`] if no mode was selected yet.
    pub fn set_value(&mut self, value: f64) -> Result<(), InstrumentError> {
        let mode = self.require_mode()?;
        self.sendcmd(&format!("{mode} {value}"))
    }

    /// Set the rising slew rate of the selected regulation mode, in units of the mode per second.
    pub fn set_pos_slew(&mut self, value: f64) -> Result<(), InstrumentError> {
        let mode = self.require_mode()?;
        self.sendcmd(&format!("{mode}:SLEW:POS {value}"))
    }

    /// Set the falling slew rate of the selected regulation mode, in units of the mode per second.
    pub fn set_neg_slew(&mut self, value: f64) -> Result<(), InstrumentError> {
        let mode = self.require_mode()?;
        self.sendcmd(&format!("{mode}:SLEW:NEG {value}"))
    }

    /// Set rising and falling slew rate to the same value.
    pub fn set_slew(&mut self, value: f64) -> Result<(), InstrumentError> {
        self.set_pos_slew(value)?;
        self.set_neg_slew(value)
    }

    /// Turn the input of this channel on.
    pub fn activate(&mut self) -> Result<(), InstrumentError> {
        self.sendcmd("INP ON")
    }

    /// Turn the input of this channel off.
    pub fn deactivate(&mut self) -> Result<(), InstrumentError> {
        self.sendcmd("INP OFF")
    }

    /// Measure the voltage across this channel.
    pub fn read_voltage(&mut self) -> Result<Voltage, InstrumentError> {
        Ok(Voltage::from_volts(self.measure("VOLT")?))
    }

    /// Measure the current through this channel.
    pub fn read_current(&mut self) -> Result<Current, InstrumentError> {
        Ok(Current::from_amperes(self.measure("CURR")?))
    }

    /// Measure the power sunk by this channel.
    pub fn read_power(&mut self) -> Result<Power, InstrumentError> {
        Ok(Power::from_watts(self.measure("POW")?))
    }

    fn state(&self) -> ChannelState {
        let channels = self.channels.lock().expect("Mutex should not be poisoned");
        channels[self.num - 1]
    }

    fn update_state<F: FnOnce(&mut ChannelState)>(&self, update: F) {
        let mut channels = self.channels.lock().expect("Mutex should not be poisoned");
        update(&mut channels[self.num - 1]);
    }

    fn require_mode(&self) -> Result<RegulationMode, InstrumentError> {
        self.mode()
            .ok_or(InstrumentError::ModeNotSet { channel: self.num })
    }

    fn measure(&mut self, quantity: &str) -> Result<f64, InstrumentError> {
        let resp = {
            let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
            intf.query(&format!("MEAS:{quantity}? (@{})", self.num))?
        };
        parse_float(&resp)
    }

    /// Send a command addressed to this channel.
    fn sendcmd(&mut self, cmd: &str) -> Result<(), InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        intf.sendcmd(&format!("{cmd}, (@{})", self.num))
    }
}

impl<T: InstrumentInterface> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            num: self.num,
            interface: self.interface.clone(),
            channels: self.channels.clone(),
        }
    }
}
