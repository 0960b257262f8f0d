//! Bench configuration read from a TOML file.
//!
//! Every field has a default, so an empty file configures the standard bench:
//!
//! ```toml
//! [bench]
//! source_idn = "N5769A"
//! sink_idn = "EL34243A"
//! sink_channel = 2
//! timeout_secs = 3.0
//!
//! [efficiency]
//! input_voltages = [16.0, 18.0]
//! pause = false
//!
//! [iv_sweep]
//! current_ceiling = 4.0
//!
//! [mppt]
//! short_circuit_current = 5.21
//! ```

use std::{fs, path::Path, time::Duration};

use benchbus::DEFAULT_TIMEOUT;
use serde::{Deserialize, Serialize};

use crate::{
    BenchError,
    sweep::{EfficiencyConfig, IvSweepConfig, MpptConfig},
};

/// Which instruments to use and how to reach them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchSection {
    /// Part of the source's identification string that selects it on the bus.
    pub source_idn: String,
    /// Part of the load's identification string that selects it on the bus.
    pub sink_idn: String,
    /// Load channel wired to the converter output, one-based.
    pub sink_channel: usize,
    /// Read timeout of the instrument sessions, in seconds.
    pub timeout_secs: f64,
}

impl BenchSection {
    /// Read timeout, the default if `timeout_secs` is not a valid duration.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(DEFAULT_TIMEOUT)
    }
}

impl Default for BenchSection {
    fn default() -> Self {
        Self {
            source_idn: "N5769A".to_string(),
            sink_idn: "EL34243A".to_string(),
            sink_channel: 2,
            timeout_secs: DEFAULT_TIMEOUT.as_secs_f64(),
        }
    }
}

/// The complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Instruments and sessions, table `[bench]`.
    pub bench: BenchSection,
    /// Table `[efficiency]`.
    pub efficiency: EfficiencyConfig,
    /// Table `[iv_sweep]`.
    pub iv_sweep: IvSweepConfig,
    /// Table `[mppt]`.
    pub mppt: MpptConfig,
}

impl BenchConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, BenchError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, BenchError> {
        Self::from_toml(&fs::read_to_string(path)?)
    }
}
