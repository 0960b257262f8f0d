//! Benchbus: talk to your bench instruments from Rust
//!
//! The Benchbus library provides a standardized, blocking interface to SCPI-style bench
//! instruments that sit on a USB instrument bus, e.g., programmable power supplies and electronic
//! loads. To do so, it provides an [`InstrumentInterface`] trait, a generic [`Instrument`] device
//! handle for anything that implements [`std::io::Read`] and [`std::io::Write`], and an
//! [`InstrumentError`] error type that instrument drivers should return.
//!
//! Instruments are located on the bus through the [`bus`] module: a [`bus::Bus`] transport lists
//! the resources it can see, [`bus::enumerate`] asks every USB resource for its identity string,
//! and [`bus::resolve`] finds the address of the first instrument whose identity contains a given
//! substring, typically a model number.
//!
//! # Currently implemented transports are:
//! - USBTMC character devices of the Linux kernel driver (`/dev/usbtmc*`).
//! - VISA resources via the [`visa-rs`](https://crates.io/crates/visa-rs) crate, behind the
//!   `visa` feature.
//!
//! # Testing drivers
//!
//! All drivers built on top of this crate should be tested with the [`LoopbackInterface`], which
//! scripts the exact commands a driver is expected to send and the responses the instrument would
//! return. For procedures that drive several instruments, it can instead answer queries from a
//! table and record every command into a [`Transcript`] shared by all instruments. The
//! [`bus::LoopbackBus`] does the same for instrument discovery.
//!
//! # Stopping other threads
//!
//! Sessions wrapped in [`Interlocked`] share an [`Interlock`]. Once a thread engages it, writes
//! from all other threads are refused, e.g., while a shutdown sequence runs.
//!
//! # License
//!
//! Licensed under either of
//!
//! - Apache License, Version 2.0 ([LICENSE-APACHE](http://www.apache.org/licenses/LICENSE-2.0))
//! - MIT license ([LICENSE-MIT](http://opensource.org/licenses/MIT))
//!
//! at your option.

#![warn(missing_docs)]

pub mod bus;
mod instrument;
mod interlock;
mod loopback;

pub use instrument::Instrument;
pub use interlock::{Interlock, Interlocked};
pub use loopback::{LoopbackInterface, Transcript};

use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

/// Default timeout for a single query.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// The error enum for all instruments.
///
/// For any command sending or querying, your instrument should return either an empty result or a
/// result with the query where this Error is the alternative. [`InstrumentError`] makes it easy to
/// propagate all the sending commands, querying errors forward with the `?` operator such that
/// errors propagate nicely.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstrumentError {
    /// No address could be resolved for an instrument. Opening a device without an address is a
    /// configuration mistake and is never retried. The error contains a description of what was
    /// looked for.
    #[error("No instrument address resolved for {0}")]
    AddressNotResolved(String),
    /// The channel number requested is out of range. The error contains the number requested and
    /// the number of channels that are currently configured.
    #[error(
        "Channel with index {idx} is out of range. Number of channels available: {nof_channels}"
    )]
    ChannelIndexOutOfRange {
        /// Index of the channel that is out of range.
        idx: usize,
        /// Total number of channels.
        nof_channels: usize,
    },
    /// The address is not among the instruments that are currently enumerated on the bus.
    #[error("Couldn't find a device at {0} on the bus")]
    DeviceNotFound(String),
    /// A write was refused because another thread engaged the [`Interlock`] of the session.
    #[error("Instrument is reserved by a shutdown in progress, command refused")]
    Interlocked,
    /// Error when an invalid argument is passed to a function. This error contains only an error
    /// message, but no arguments. It is intended for the user.
    #[error("{0}")]
    InvalidArgument(String),
    /// Error when reading from/writing to an interface. See [`std::io::Error`] for more details.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A set-point or slew command was issued for a channel that has no regulation mode yet.
    #[error("Channel {channel} has no regulation mode set, select a mode first")]
    ModeNotSet {
        /// Number of the channel without a mode.
        channel: usize,
    },
    /// Instrument response could not be parsed becuase it was unexpected by the driver. This error
    /// contains the response that was received from the instrument.
    #[error("Response from instrument could not be parsed. Response was: {0}")]
    ResponseParseError(String),
    /// Timeout occurred while waiting for a response from the instrument. The error contains the
    /// timeout that was exceeded.
    #[error(
        "Timeout occured while waiting for a response from the instrument. Timeout was set to {0:?}."
    )]
    Timeout(Duration),
    /// Timeout occurred while waiting for a response to a query. The error contains the query
    /// that was sent and the timeout that was exceeded.
    #[error(
        "Timeout occured while waiting for a response to query: {query}. Timeout was set to {timeout:?}."
    )]
    TimeoutQuery {
        /// The query that timed out.
        query: String,
        /// The timeout that was set.
        timeout: Duration,
    },
    #[cfg(feature = "visa")]
    /// Errors reported by the VISA library. See the [`visa_rs::Error`] documentation for more
    /// information.
    #[error(transparent)]
    Visa(#[from] visa_rs::Error),
}

/// The `InstrumentInterface` trait defines the interface for controlling instruments.
///
/// Implementors only have to provide raw byte reading and writing. Sending terminated commands,
/// reading terminated responses, and querying are provided on top of these two methods.
pub trait InstrumentInterface {
    /// Read exactly as many bytes from the instrument as fit into `buf`.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError>;

    /// Write raw bytes to the instrument and flush the interface.
    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError>;

    /// Get the terminator that ends commands and responses.
    fn get_terminator(&self) -> &str {
        "\n"
    }

    /// Set the terminator of an interface from a `&str`.
    ///
    /// # Arguments:
    /// - `_terminator` - A string slice that will be used as the terminator for commands
    fn set_terminator(&mut self, _terminator: &str) {}

    /// Get the timeout after which a read is abandoned.
    fn get_timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    /// Write a string slice to the instrument as is, without a terminator.
    fn write(&mut self, data: &str) -> Result<(), InstrumentError> {
        self.write_raw(data.as_bytes())
    }

    /// Send a command to the instrument.
    ///
    /// This function takes the command, appends the terminator, and writes it to the instrument.
    ///
    /// # Arguments:
    /// - `cmd` - A string slice that will be sent to the instrument.
    fn sendcmd(&mut self, cmd: &str) -> Result<(), InstrumentError> {
        debug!("-> {cmd}");
        let data = format!("{cmd}{}", self.get_terminator());
        self.write(&data)
    }

    /// Read from the instrument until the terminator is encountered.
    ///
    /// Bytes are read one by one. If no terminator shows up before the timeout of the interface
    /// elapsed, a [`InstrumentError::Timeout`] is returned. The terminator and surrounding
    /// whitespace are stripped from the response. Invalid UTF-8 is replaced lossily.
    fn read_until_terminator(&mut self) -> Result<String, InstrumentError> {
        let terminator = self.get_terminator().as_bytes().to_vec();
        let timeout = self.get_timeout();
        let mut response: Vec<u8> = Vec::new();
        let mut single_buf = [0u8];

        let tic = Instant::now();
        while tic.elapsed() < timeout {
            self.read_exact(&mut single_buf)?;
            response.push(single_buf[0]);
            if response.ends_with(&terminator) {
                let response = String::from_utf8_lossy(&response).trim().to_string();
                debug!("<- {response}");
                return Ok(response);
            }
        }
        Err(InstrumentError::Timeout(timeout))
    }

    /// Query the instrument with a command and return the response as a String.
    ///
    /// # Arguments
    /// * `cmd` - The command to send to the instrument for which we expect a response.
    fn query(&mut self, cmd: &str) -> Result<String, InstrumentError> {
        self.sendcmd(cmd)?;
        self.read_until_terminator().map_err(|err| match err {
            InstrumentError::Timeout(timeout) => InstrumentError::TimeoutQuery {
                query: cmd.to_string(),
                timeout,
            },
            other => other,
        })
    }
}

/// Parse a numeric instrument response, e.g., `"+1.20000E+01"`, into a float.
pub fn parse_float(response: &str) -> Result<f64, InstrumentError> {
    response
        .trim()
        .parse::<f64>()
        .map_err(|_| InstrumentError::ResponseParseError(response.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_float() {
        assert_eq!(12.0, parse_float("+1.20000E+01").unwrap());
        assert_eq!(0.5, parse_float(" 0.5\n").unwrap());
        assert!(matches!(
            parse_float("OVLD"),
            Err(InstrumentError::ResponseParseError(resp)) if resp == "OVLD"
        ));
    }
}
