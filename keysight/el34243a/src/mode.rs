//! Regulation and sense settings of a load channel.

use std::{fmt::Display, str::FromStr};

use benchbus::InstrumentError;

/// The control variable a load channel regulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegulationMode {
    /// Constant current, set-points in ampere.
    Current,
    /// Constant resistance, set-points in ohm.
    Resistance,
    /// Constant power, set-points in watt.
    Power,
    /// Constant voltage, set-points in volt.
    Voltage,
}

impl RegulationMode {
    /// All modes the load accepts.
    pub const ALL: [RegulationMode; 4] = [
        RegulationMode::Current,
        RegulationMode::Resistance,
        RegulationMode::Power,
        RegulationMode::Voltage,
    ];

    /// SCPI mnemonic of the mode, which doubles as the command namespace for set-points and
    /// slew rates.
    pub fn as_str(&self) -> &'static str {
        match self {
            RegulationMode::Current => "CURR",
            RegulationMode::Resistance => "RES",
            RegulationMode::Power => "POW",
            RegulationMode::Voltage => "VOLT",
        }
    }

    /// Unit of set-point values in this mode.
    pub fn unit(&self) -> &'static str {
        match self {
            RegulationMode::Current => "A",
            RegulationMode::Resistance => "ohm",
            RegulationMode::Power => "W",
            RegulationMode::Voltage => "V",
        }
    }
}

impl Display for RegulationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RegulationMode {
    type Err = InstrumentError;

    /// Parse the SCPI mnemonic of a mode. Anything but `CURR`, `RES`, `POW`, and `VOLT` is an
    /// invalid argument.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegulationMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s.trim())
            .ok_or_else(|| InstrumentError::InvalidArgument(format!("Unsupported mode {s}")))
    }
}

/// Where a channel senses the voltage it regulates on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SenseSource {
    /// At the load's own terminals.
    #[default]
    Internal,
    /// At the remote sense terminals, i.e., at the device under test.
    External,
}

impl SenseSource {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            SenseSource::Internal => "INT",
            SenseSource::External => "EXT",
        }
    }
}

impl From<bool> for SenseSource {
    fn from(remote_sense: bool) -> Self {
        if remote_sense {
            SenseSource::External
        } else {
            SenseSource::Internal
        }
    }
}

/// Settings recorded for one channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChannelState {
    pub(crate) mode: Option<RegulationMode>,
    pub(crate) sense: SenseSource,
}
