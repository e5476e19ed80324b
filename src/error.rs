//! Error types for the Master-8 driver.
//!
//! `Master8Error` consolidates everything a driver call can fail with. The
//! variants fall into three groups:
//!
//! - **Argument errors** (`InvalidArgument`): a channel or paradigm outside
//!   1-8, a value outside its bounds, or a mode that resolves to no channel
//!   mode. These are always raised before any byte of the offending call is
//!   written, so the device never sees a partial command.
//! - **Transport errors** (`Transport`, `Serial`): the underlying connection
//!   failed to open, write or close. They are propagated unchanged and never
//!   retried.
//! - **Configuration errors** (`Configuration`, `Config`,
//!   `SerialFeatureDisabled`): the connection could not be resolved from the
//!   address, configuration file or environment.
//!
//! By using `#[from]`, the underlying error types convert with the `?`
//! operator.

use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type Result<T> = std::result::Result<T, Master8Error>;

/// Primary error type for the Master-8 driver.
#[derive(Error, Debug)]
pub enum Master8Error {
    /// An argument failed validation. Nothing was written.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The connection failed while writing or closing.
    ///
    /// Writing to a transport that is not open also lands here with
    /// `std::io::ErrorKind::NotConnected`.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The serial port could not be opened.
    #[cfg(feature = "instrument_serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The connection description is not one the driver understands
    /// (unknown URL scheme, empty address, invalid settings).
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Loading or extracting the configuration failed.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// A serial connection was requested from a build without serial support.
    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,
}

impl Master8Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// True for argument validation failures.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// True for failures raised by the connection itself.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            #[cfg(feature = "instrument_serial")]
            Self::Serial(_) => true,
            _ => false,
        }
    }

    /// True for failures resolving the connection or configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Config(_) | Self::SerialFeatureDisabled
        )
    }
}

impl From<figment::Error> for Master8Error {
    fn from(value: figment::Error) -> Self {
        Self::Config(Box::new(value))
    }
}
