//! Bus transport over a system VISA library using `visa-rs`.

use std::{ffi::CString, time::Duration};

use visa_rs::prelude::*;

use crate::{Instrument, InstrumentError, bus::Bus};

/// A bus backed by the default VISA resource manager.
pub struct VisaBus {
    rm: DefaultRM,
}

impl VisaBus {
    /// Open the default VISA resource manager.
    pub fn try_new() -> Result<Self, InstrumentError> {
        Ok(Self {
            rm: DefaultRM::new()?,
        })
    }
}

fn visa_string(text: &str) -> Result<VisaString, InstrumentError> {
    let c_string = CString::new(text)
        .map_err(|_| InstrumentError::InvalidArgument(format!("Invalid VISA string: {text}")))?;
    Ok(VisaString::from(c_string))
}

impl Bus for VisaBus {
    type Session = Instrument<visa_rs::Instrument>;

    fn list_resources(&mut self) -> Result<Vec<String>, InstrumentError> {
        let mut list = self.rm.find_res_list(&visa_string("?*INSTR")?)?;
        let mut resources = Vec::new();
        while let Some(res) = list.find_next()? {
            resources.push(res.to_string());
        }
        Ok(resources)
    }

    fn open(&mut self, address: &str, timeout: Duration) -> Result<Self::Session, InstrumentError> {
        let session = self
            .rm
            .open(&visa_string(address)?, AccessMode::NO_LOCK, timeout)?;
        Ok(Instrument::new(session, timeout))
    }
}
