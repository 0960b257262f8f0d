use benchbus::InstrumentError;
use thiserror::Error;

/// Errors that can end a bench run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BenchError {
    /// Bus, addressing, or instrument errors. See [`InstrumentError`].
    #[error(transparent)]
    Instrument(#[from] InstrumentError),
    /// Reading a profile or writing measurements as CSV failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// The configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    /// File or console I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The MPPT profile is empty or not ordered in time.
    #[error("Invalid MPPT profile: {0}")]
    Profile(String),
    /// Operator input ended before the confirmation token was entered.
    #[error("Operator input closed before the sweep was confirmed")]
    OperatorAborted,
}
