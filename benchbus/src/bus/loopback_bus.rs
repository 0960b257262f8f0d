//! A scripted bus for testing instrument discovery.

use std::time::Duration;

use crate::{InstrumentError, LoopbackInterface, bus::Bus};

/// A bus that knows a fixed list of resources and their identity strings.
///
/// Every opened session is a [`LoopbackInterface`] that expects exactly one `*IDN?` query and
/// answers with the scripted identity.
///
/// ```
/// use benchbus::bus::{self, LoopbackBus};
///
/// let mut lbk = LoopbackBus::new(vec![(
///     "USB0::0x2A8D::0x0F02::MY1::0::INSTR",
///     "Keysight Technologies,N5769A,MY1,B.01.02",
/// )]);
/// let addr = bus::resolve(&mut lbk, "N5769A").unwrap();
/// assert_eq!(Some("USB0::0x2A8D::0x0F02::MY1::0::INSTR".to_string()), addr);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoopbackBus {
    devices: Vec<(String, String)>,
}

impl LoopbackBus {
    /// Create a new loopback bus from `(address, identity)` pairs, listed in the given order.
    pub fn new(devices: Vec<(&str, &str)>) -> Self {
        Self {
            devices: devices
                .into_iter()
                .map(|(addr, idn)| (addr.to_string(), idn.to_string()))
                .collect(),
        }
    }
}

impl Bus for LoopbackBus {
    type Session = LoopbackInterface;

    fn list_resources(&mut self) -> Result<Vec<String>, InstrumentError> {
        Ok(self.devices.iter().map(|(addr, _)| addr.clone()).collect())
    }

    fn open(&mut self, address: &str, _timeout: Duration) -> Result<Self::Session, InstrumentError> {
        let (_, idn) = self
            .devices
            .iter()
            .find(|(addr, _)| addr == address)
            .ok_or_else(|| InstrumentError::DeviceNotFound(address.to_string()))?;
        Ok(LoopbackInterface::new(
            vec!["*IDN?".to_string()],
            vec![idn.clone()],
            "\n",
        ))
    }
}
