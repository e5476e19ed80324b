//! # Master-8 Driver Library
//!
//! Host-side driver for the AMPI Master-8 eight-channel pulse stimulator. The
//! device is programmed over RS-232 by sending the same keystrokes as its
//! front panel; this crate turns typed operations ("set channel 2 to train
//! mode", "copy paradigm 1 into 4") into those keystrokes, checks every
//! argument against the device's limits, and writes the result to a
//! connection.
//!
//! ## Crate Structure
//!
//! - **`driver`**: The `Master8` command encoder with one method per device
//!   operation.
//! - **`key`**: The fixed key table (`Key`) and the six channel modes
//!   (`ChannelMode`).
//! - **`command`**: Wire tokens, validated channel/paradigm numbers, value
//!   bounds and the device's decimal formatting.
//! - **`transport`**: The `Transport` trait and its serial, generic writer and
//!   in-memory loopback implementations.
//! - **`config`**: Figment-based configuration of the connection and logging.
//! - **`logging`**: `tracing-subscriber` initialisation.
//! - **`error`**: The `Master8Error` enum shared by every module.
//!
//! ## Example
//!
//! ```
//! use master8::{ChannelMode, LoopbackTransport, Master8};
//!
//! let link = LoopbackTransport::new();
//! let mut stim = Master8::new(link.clone());
//!
//! stim.change_channel_mode(3, ChannelMode::Train).unwrap();
//! stim.set_channel_duration(3, 40e-6).unwrap();
//!
//! assert_eq!(link.messages(), vec!["N 3 E", "D 3", "0.00004 E 0 E"]);
//! assert!(stim.connect_channel(9, 1).is_err());
//! ```

pub mod command;
pub mod config;
pub mod driver;
pub mod error;
pub mod key;
pub mod logging;
pub mod transport;

pub use command::{Bounds, Channel, Paradigm, Token};
pub use config::{ConnectionConfig, Master8Config};
pub use driver::Master8;
pub use error::{Master8Error, Result};
pub use key::{ChannelMode, Key, ModeSelector};
pub use transport::{IoTransport, LoopbackTransport, Transport};

#[cfg(feature = "instrument_serial")]
pub use transport::{SerialSettings, SerialTransport};
