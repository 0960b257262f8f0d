//! Instrument discovery and addressing on a USB instrument bus.
//!
//! A [`Bus`] lists the locators of the resources it can reach and opens sessions to them. On top
//! of that, this module resolves instruments by their identity string:
//!
//! ```no_run
//! use benchbus::{DEFAULT_TIMEOUT, bus::{self, UsbtmcBus}};
//!
//! let mut usb = UsbtmcBus::default();
//! let addr = bus::resolve(&mut usb, "N5769A").unwrap();
//! let psu = bus::connect(&mut usb, addr.as_deref(), DEFAULT_TIMEOUT).unwrap();
//! ```

mod loopback_bus;
mod usbtmc;
#[cfg(feature = "visa")]
mod visa;

pub use loopback_bus::LoopbackBus;
pub use usbtmc::UsbtmcBus;
#[cfg(feature = "visa")]
pub use visa::VisaBus;

use std::{fmt::Display, time::Duration};

use log::{debug, info};

use crate::{DEFAULT_TIMEOUT, InstrumentError, InstrumentInterface};

/// Marker that a locator belongs to the USB transport class.
pub const USB_TRANSPORT: &str = "USB";

/// Identification of one instrument as reported during a single enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    /// Opaque bus locator, e.g., `USB0::0x2A8D::0x0F02::MY12345678::0::INSTR`.
    pub address: String,
    /// The response of the instrument to `*IDN?`.
    pub identity: String,
}

impl Display for IdentityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.address, self.identity)
    }
}

/// A transport that can discover instruments and open sessions to them.
pub trait Bus {
    /// The type of an opened session.
    type Session: InstrumentInterface;

    /// List the locators of all resources currently visible on this transport.
    fn list_resources(&mut self) -> Result<Vec<String>, InstrumentError>;

    /// Open a session to the resource at the given locator.
    ///
    /// # Arguments
    /// * `address` - Locator as returned by `list_resources`.
    /// * `timeout` - Read timeout of the session.
    fn open(&mut self, address: &str, timeout: Duration) -> Result<Self::Session, InstrumentError>;
}

/// Enumerate all USB instruments on the bus together with their identity strings.
///
/// Resources whose locator does not contain [`USB_TRANSPORT`] are skipped. Every remaining
/// resource is opened and queried with `*IDN?`. The records are returned in bus order.
pub fn enumerate<B: Bus>(bus: &mut B) -> Result<Vec<IdentityRecord>, InstrumentError> {
    let mut records = Vec::new();
    for address in bus.list_resources()? {
        if !address.contains(USB_TRANSPORT) {
            debug!("Skipping non-USB resource {address}");
            continue;
        }
        let mut session = bus.open(&address, DEFAULT_TIMEOUT)?;
        let identity = session.query("*IDN?")?;
        records.push(IdentityRecord { address, identity });
    }
    Ok(records)
}

/// Find the address of the first instrument whose identity contains `idn`.
///
/// The match is a case-sensitive substring match on a fresh enumeration. Returns `None` if no
/// enumerated instrument matches.
pub fn resolve<B: Bus>(bus: &mut B, idn: &str) -> Result<Option<String>, InstrumentError> {
    let address = enumerate(bus)?
        .into_iter()
        .find(|rec| rec.identity.contains(idn))
        .map(|rec| rec.address);
    match &address {
        Some(addr) => info!("Resolved {idn} to {addr}"),
        None => info!("No instrument matching {idn} found"),
    }
    Ok(address)
}

/// Open a device handle for a resolved address.
///
/// An absent address and an address that is not currently enumerated are both fatal
/// configuration errors.
pub fn connect<B: Bus>(
    bus: &mut B,
    address: Option<&str>,
    timeout: Duration,
) -> Result<B::Session, InstrumentError> {
    let address = address.ok_or_else(|| {
        InstrumentError::AddressNotResolved("an instrument without address".to_string())
    })?;
    if !enumerate(bus)?.iter().any(|rec| rec.address == address) {
        return Err(InstrumentError::DeviceNotFound(address.to_string()));
    }
    bus.open(address, timeout)
}

/// Resolve an instrument by its identity substring and open it in one go.
pub fn connect_by_idn<B: Bus>(
    bus: &mut B,
    idn: &str,
    timeout: Duration,
) -> Result<B::Session, InstrumentError> {
    let address = resolve(bus, idn)?
        .ok_or_else(|| InstrumentError::AddressNotResolved(format!("identity '{idn}'")))?;
    connect(bus, Some(&address), timeout)
}
