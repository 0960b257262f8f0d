//! This module provides the device handle that implements the Instrument Interface trait.
//!
//! It can be called with any type that implements [`std::io::Read`] and [`std::io::Write`],
//! such as a USBTMC character device opened as a [`std::fs::File`] or a VISA session.

use std::time::Duration;

use crate::{InstrumentError, InstrumentInterface};

/// A general instrument handle that can be built with any port that implements
/// [`std::io::Read`] and [`std::io::Write`].
///
/// One handle is bound to exactly one opened bus session. It owns the session, the terminator,
/// and the read timeout. The handle is closed when it is dropped.
///
/// # Example
///
/// ```no_run
/// use std::{fs::OpenOptions, time::Duration};
///
/// use benchbus::{Instrument, InstrumentInterface};
///
/// let port = OpenOptions::new().read(true).write(true).open("/dev/usbtmc0").unwrap();
/// let mut inst = Instrument::new(port, Duration::from_secs(3));
/// println!("{}", inst.query("*IDN?").unwrap());
/// ```
#[derive(Debug)]
pub struct Instrument<P: std::io::Read + std::io::Write> {
    port: P,
    terminator: String,
    timeout: Duration,
}

impl<P: std::io::Read + std::io::Write> Instrument<P> {
    /// Create a new instance of [`Instrument`] with a given port and read timeout.
    pub fn new(port: P, timeout: Duration) -> Self {
        Self {
            port,
            terminator: "\n".to_string(),
            timeout,
        }
    }

    /// Change the read timeout of this handle.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

impl<P: std::io::Read + std::io::Write> InstrumentInterface for Instrument<P> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError> {
        self.port.read_exact(buf)?;
        Ok(())
    }

    fn get_terminator(&self) -> &str {
        self.terminator.as_str()
    }

    fn set_terminator(&mut self, terminator: &str) {
        self.terminator = terminator.to_string();
    }

    fn get_timeout(&self) -> Duration {
        self.timeout
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }
}
