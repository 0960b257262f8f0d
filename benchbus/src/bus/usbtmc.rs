//! Bus transport over the USBTMC kernel driver of Linux.
//!
//! Every USB test and measurement class device shows up as a character device `/dev/usbtmcN`
//! that can be read and written like a file.

use std::{
    fs::{File, OpenOptions},
    path::PathBuf,
    time::Duration,
};

use crate::{Instrument, InstrumentError, bus::Bus};

const LOCATOR_PREFIX: &str = "USB0::";
const LOCATOR_SUFFIX: &str = "::INSTR";

/// A bus that discovers USBTMC character devices in a device directory.
#[derive(Debug, Clone)]
pub struct UsbtmcBus {
    dev_dir: PathBuf,
}

impl UsbtmcBus {
    /// Create a bus that looks for `usbtmc*` devices in the given directory.
    pub fn new(dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
        }
    }

    /// Turn a locator back into the path of its character device.
    fn device_path(address: &str) -> Result<PathBuf, InstrumentError> {
        address
            .strip_prefix(LOCATOR_PREFIX)
            .and_then(|rest| rest.strip_suffix(LOCATOR_SUFFIX))
            .map(PathBuf::from)
            .ok_or_else(|| {
                InstrumentError::InvalidArgument(format!("Not a USBTMC locator: {address}"))
            })
    }
}

impl Default for UsbtmcBus {
    fn default() -> Self {
        Self::new("/dev")
    }
}

impl Bus for UsbtmcBus {
    type Session = Instrument<File>;

    fn list_resources(&mut self) -> Result<Vec<String>, InstrumentError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.dev_dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with("usbtmc") {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths
            .iter()
            .map(|p| format!("{LOCATOR_PREFIX}{}{LOCATOR_SUFFIX}", p.display()))
            .collect())
    }

    fn open(&mut self, address: &str, timeout: Duration) -> Result<Self::Session, InstrumentError> {
        let path = Self::device_path(address)?;
        let port = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Instrument::new(port, timeout))
    }
}
