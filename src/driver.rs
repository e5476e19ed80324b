//! AMPI Master-8 Pulse Stimulator Driver
//!
//! Reference: Master-8 Operation Manual, "Computer control" appendix
//!
//! Protocol Overview:
//! - Format: ASCII keystrokes over RS-232, one character per front-panel key
//! - Tokens are separated by a single space; there is no line terminator
//! - ENTER (`E`) commits an entry, exactly as on the keypad
//! - The device does not acknowledge commands; nothing is read back
//!
//! Command shapes:
//! - `A <paradigm> E` selects a stored paradigm
//! - `<mode> <channel> E` sets a channel mode (`O F N G C T`)
//! - `D|I|L <channel>` then `<seconds> E 0 E` sets a time value
//! - `V <channel>` then `<volts> E` (and `-`, `E` when negative) sets a voltage
//! - `X|Z <src> <dest> E` connects / disconnects channels
//!
//! Every operation validates all of its arguments before the first byte is
//! written, so a rejected call leaves the device untouched.
//!
//! # Usage
//!
//! ```rust,no_run
//! use master8::{ChannelMode, Master8};
//!
//! # fn main() -> master8::Result<()> {
//! let mut stim = Master8::open("/dev/ttyUSB0")?;
//! stim.change_paradigm(1)?;
//! stim.change_channel_mode(1, ChannelMode::Train)?;
//! stim.set_channel_duration(1, 200e-6)?;
//! stim.set_channel_interval(1, 0.05)?;
//! stim.set_channel_m(1, 10)?;
//! stim.trigger(1)?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use tracing::{instrument, trace};

use crate::command::{
    self, interval_tokens, voltage_messages, Bounds, Channel, Paradigm, Token,
    INTERVAL_PRECISION, MIN_DELAY, MIN_DURATION, MIN_INTERVAL, VOLTAGE_PRECISION,
};
use crate::config::ConnectionConfig;
use crate::error::{Master8Error, Result};
use crate::key::{Key, ModeSelector};
use crate::transport::{LoopbackTransport, Transport};

#[cfg(feature = "instrument_serial")]
use crate::transport::{SerialSettings, SerialTransport};

/// Command encoder for a Master-8 stimulator.
///
/// Owns its transport exclusively. Every method takes `&mut self`; callers
/// sharing a driver between threads must serialise access themselves.
pub struct Master8<T: Transport = Box<dyn Transport>> {
    transport: T,
}

impl<T: Transport> Master8<T> {
    /// Drive the device through an already open transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport, for external setup of an
    /// unconfigured connection.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give up the driver and return its transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    // =========================================================================
    // Raw output
    // =========================================================================

    /// Join `tokens` with single spaces and write them as one message.
    ///
    /// No ENTER is appended; include [`Key::Enter`] where the command needs it.
    pub fn write_raw<I>(&mut self, tokens: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Token>,
    {
        let tokens: Vec<Token> = tokens.into_iter().map(Into::into).collect();
        self.send(&tokens)
    }

    fn send(&mut self, tokens: &[Token]) -> Result<()> {
        let message = command::render(tokens);
        trace!(
            transport = %self.transport.describe(),
            command = %message.escape_default(),
            "Sending Master-8 command"
        );
        self.transport.write(message.as_bytes())?;
        Ok(())
    }

    fn send_all(&mut self, messages: &[Vec<Token>]) -> Result<()> {
        for message in messages {
            self.send(message)?;
        }
        Ok(())
    }

    /// Write a time value in seconds as `<value> E 0 E`.
    ///
    /// The value is formatted with `precision` fractional digits, then
    /// trailing zeros and a trailing decimal point are removed.
    ///
    /// # Errors
    /// `InvalidArgument` if `value` is not finite or lies outside `bounds`.
    #[instrument(skip(self), err)]
    pub fn write_interval(&mut self, value: f64, bounds: Bounds, precision: usize) -> Result<()> {
        let tokens = interval_tokens(value, bounds, precision)?;
        self.send(&tokens)
    }

    /// Write a voltage: the rounded magnitude and ENTER, followed by the sign
    /// key and ENTER when `value` is negative.
    ///
    /// # Errors
    /// `InvalidArgument` if `value` is not finite or lies outside `bounds`.
    #[instrument(skip(self), err)]
    pub fn write_voltage(&mut self, value: f64, bounds: Bounds, precision: usize) -> Result<()> {
        let messages = voltage_messages(value, bounds, precision)?;
        self.send_all(&messages)
    }

    // =========================================================================
    // Paradigms
    // =========================================================================

    /// Load stored paradigm `paradigm` (1-8): `A <paradigm> E`.
    #[instrument(skip(self), err)]
    pub fn change_paradigm(&mut self, paradigm: u8) -> Result<()> {
        let paradigm = Paradigm::new(paradigm)?;
        self.send(&[Key::All.into(), paradigm.into(), Key::Enter.into()])
    }

    /// Clear the current paradigm: `O A A E`.
    #[instrument(skip(self), err)]
    pub fn clear_paradigm(&mut self) -> Result<()> {
        self.send(&[
            Key::Off.into(),
            Key::All.into(),
            Key::All.into(),
            Key::Enter.into(),
        ])
    }

    /// Copy paradigm `src` into `dest`: `A <src> <dest> E`.
    #[instrument(skip(self), err)]
    pub fn copy_paradigm(&mut self, src: u8, dest: u8) -> Result<()> {
        let src = Paradigm::new(src)?;
        let dest = Paradigm::new(dest)?;
        self.send(&[
            Key::All.into(),
            src.into(),
            dest.into(),
            Key::Enter.into(),
        ])
    }

    // =========================================================================
    // Channel settings
    // =========================================================================

    /// Set the triggering mode of `channel`: `<mode key> <channel> E`.
    ///
    /// `mode` may be a mode index (0-5 in the order Off, FreeRun, Train,
    /// Trigger, DC, Gate), a mode [`Key`], its character, or a
    /// [`ChannelMode`](crate::ChannelMode). The index and key forms of the same
    /// mode produce identical output.
    #[instrument(skip(self, mode), fields(mode = tracing::field::Empty), err)]
    pub fn change_channel_mode(
        &mut self,
        channel: u8,
        mode: impl Into<ModeSelector>,
    ) -> Result<()> {
        let channel = Channel::new(channel)?;
        let mode = mode.into().resolve()?;
        tracing::Span::current().record("mode", &tracing::field::display(mode));
        self.send(&[mode.key().into(), channel.into(), Key::Enter.into()])
    }

    /// Set the pulse duration of `channel` in seconds (at least 40 µs).
    #[instrument(skip(self), err)]
    pub fn set_channel_duration(&mut self, channel: u8, duration: f64) -> Result<()> {
        self.set_channel_time(Key::Duration, channel, duration, MIN_DURATION)
    }

    /// Set the inter-pulse interval of `channel` in seconds (at least 60 µs).
    #[instrument(skip(self), err)]
    pub fn set_channel_interval(&mut self, channel: u8, interval: f64) -> Result<()> {
        self.set_channel_time(Key::Interval, channel, interval, MIN_INTERVAL)
    }

    /// Set the trigger delay of `channel` in seconds (at least 100 µs).
    #[instrument(skip(self), err)]
    pub fn set_channel_delay(&mut self, channel: u8, delay: f64) -> Result<()> {
        self.set_channel_time(Key::Delay, channel, delay, MIN_DELAY)
    }

    fn set_channel_time(&mut self, key: Key, channel: u8, seconds: f64, min: f64) -> Result<()> {
        let channel = Channel::new(channel)?;
        let value = interval_tokens(seconds, Bounds::at_least(min), INTERVAL_PRECISION)?;
        self.send_all(&[vec![Token::from(key), Token::from(channel)], value])
    }

    /// Set the number of pulses per train on `channel`: `M <channel> <m> E 0 E`.
    #[instrument(skip(self), err)]
    pub fn set_channel_m(&mut self, channel: u8, m: u32) -> Result<()> {
        let channel = Channel::new(channel)?;
        self.send(&[
            Key::M.into(),
            channel.into(),
            m.into(),
            Key::Enter.into(),
            Token::Number(0),
            Key::Enter.into(),
        ])
    }

    /// Set the output voltage of `channel` (-12.7 V to 12.7 V, 0.1 V steps).
    #[instrument(skip(self), err)]
    pub fn set_channel_voltage(&mut self, channel: u8, voltage: f64) -> Result<()> {
        let channel = Channel::new(channel)?;
        let mut messages = vec![vec![Token::from(Key::Voltage), Token::from(channel)]];
        messages.extend(voltage_messages(voltage, Bounds::VOLTAGE, VOLTAGE_PRECISION)?);
        self.send_all(&messages)
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Fire a manual trigger on `channel`. The device reads a bare channel
    /// number as a trigger keypress.
    #[instrument(skip(self), err)]
    pub fn trigger(&mut self, channel: u8) -> Result<()> {
        let channel = Channel::new(channel)?;
        self.send(&[channel.into()])
    }

    /// Make `src` trigger `triggered`: `X <src> <triggered> E`.
    #[instrument(skip(self), err)]
    pub fn connect_channel(&mut self, src: u8, triggered: u8) -> Result<()> {
        self.channel_link(Key::Connect, src, triggered)
    }

    /// Remove a connection made by [`connect_channel`](Self::connect_channel):
    /// `Z <src> <triggered> E`.
    #[instrument(skip(self), err)]
    pub fn disconnect_channel(&mut self, src: u8, triggered: u8) -> Result<()> {
        self.channel_link(Key::Disconnect, src, triggered)
    }

    fn channel_link(&mut self, key: Key, src: u8, triggered: u8) -> Result<()> {
        let src = Channel::new(src)?;
        let triggered = Channel::new(triggered)?;
        self.send(&[
            key.into(),
            src.into(),
            triggered.into(),
            Key::Enter.into(),
        ])
    }

    // =========================================================================
    // Connection state
    // =========================================================================

    /// True while the transport reports itself open.
    pub fn connected(&self) -> bool {
        self.transport.is_open()
    }

    /// Passing `false` closes the transport. Reconnecting is not supported:
    /// passing `true` fails with `InvalidArgument` and changes nothing.
    #[instrument(skip(self), err)]
    pub fn set_connected(&mut self, connected: bool) -> Result<()> {
        if connected {
            return Err(Master8Error::invalid(
                "connections can only be established when the driver is constructed",
            ));
        }
        self.transport.close()?;
        tracing::debug!(transport = %self.transport.describe(), "Master-8 connection closed");
        Ok(())
    }
}

impl Master8<Box<dyn Transport>> {
    /// Open a connection from an address string.
    ///
    /// - `loop://` opens an in-memory loopback.
    /// - `serial://<path>` or a bare path such as `/dev/ttyUSB0` or `COM3`
    ///   opens a serial port at 9600 baud.
    ///
    /// # Errors
    /// `Configuration` for empty addresses or unknown schemes, `Serial` if
    /// the port cannot be opened, `SerialFeatureDisabled` for serial
    /// addresses in builds without serial support.
    pub fn open(address: &str) -> Result<Self> {
        Self::from_config(&ConnectionConfig::Url {
            url: address.to_string(),
        })
    }

    /// Build a driver from a connection configuration.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        let transport = config.connect()?;
        tracing::info!(transport = %transport.describe(), "Master-8 driver ready");
        Ok(Self::new(transport))
    }
}

impl Master8<LoopbackTransport> {
    /// A driver writing into an in-memory loopback.
    pub fn loopback() -> Self {
        Self::new(LoopbackTransport::new())
    }
}

#[cfg(feature = "instrument_serial")]
impl Master8<SerialTransport> {
    /// A driver whose serial port still has to be opened, via
    /// [`transport_mut`](Self::transport_mut) and
    /// [`SerialTransport::open_port`].
    pub fn unconfigured() -> Self {
        Self::new(SerialTransport::unconfigured())
    }

    /// Open the serial port at `path`.
    pub fn open_serial(path: &str, settings: &SerialSettings) -> Result<Self> {
        Ok(Self::new(SerialTransport::open(path, settings)?))
    }
}

impl<T: Transport> fmt::Debug for Master8<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Master8")
            .field("transport", &self.transport.describe())
            .field("connected", &self.transport.is_open())
            .finish()
    }
}
