//! Byte-stream connections the driver writes to.
//!
//! The driver never reads from the device; a transport only has to accept
//! writes, report whether it is open, and close. Three implementations are
//! provided:
//!
//! - [`SerialTransport`]: an RS-232 / USB-serial port via `serialport`
//!   (feature `instrument_serial`).
//! - [`IoTransport`]: any `std::io::Write` (TCP stream, pipe, file).
//! - [`LoopbackTransport`]: an in-memory record of every message, used for
//!   `loop://` addresses and for tests.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// A write-only, exclusively owned connection to the device.
pub trait Transport: Send {
    /// Write one message. Blocks until the underlying write returns.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Whether the connection is currently open.
    fn is_open(&self) -> bool;

    /// Close the connection. Closing an already closed transport is a no-op.
    fn close(&mut self) -> io::Result<()>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

fn not_connected(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotConnected,
        format!("{} is not open", what),
    )
}

// =============================================================================
// Serial
// =============================================================================

#[cfg(feature = "instrument_serial")]
pub use serial::{SerialSettings, SerialTransport};

#[cfg(feature = "instrument_serial")]
mod serial {
    use super::{not_connected, Transport};
    use crate::error::Result;
    use serialport::SerialPort;
    use std::io::{self, Write};
    use std::time::Duration;
    use tracing::{debug, info};

    /// Line settings for the serial link. Data format is fixed at 8N1 with no
    /// flow control.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SerialSettings {
        /// Baud rate (the Master-8 ships configured for 9600).
        pub baud_rate: u32,
        /// Write timeout.
        pub timeout: Duration,
    }

    impl Default for SerialSettings {
        fn default() -> Self {
            Self {
                baud_rate: 9600,
                timeout: Duration::from_millis(500),
            }
        }
    }

    /// A serial port, possibly not yet opened.
    pub struct SerialTransport {
        path: Option<String>,
        port: Option<Box<dyn SerialPort>>,
    }

    impl SerialTransport {
        /// Open `path` with the given settings.
        ///
        /// # Errors
        /// Returns `Master8Error::Serial` if the port cannot be opened.
        pub fn open(path: &str, settings: &SerialSettings) -> Result<Self> {
            let mut transport = Self::unconfigured();
            transport.open_port(path, settings)?;
            Ok(transport)
        }

        /// A transport with no port attached. It reports closed and refuses
        /// writes until [`open_port`](Self::open_port) succeeds.
        pub fn unconfigured() -> Self {
            Self {
                path: None,
                port: None,
            }
        }

        /// Wrap a port the caller has already opened.
        pub fn from_port(port: Box<dyn SerialPort>) -> Self {
            Self {
                path: port.name(),
                port: Some(port),
            }
        }

        /// Open (or reopen) the port at `path`. Any previously open port is
        /// dropped first.
        pub fn open_port(&mut self, path: &str, settings: &SerialSettings) -> Result<()> {
            self.port = None;
            let port = serialport::new(path, settings.baud_rate)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .flow_control(serialport::FlowControl::None)
                .timeout(settings.timeout)
                .open()?;
            info!(path, baud_rate = settings.baud_rate, "Opened Master-8 serial port");
            self.path = Some(path.to_string());
            self.port = Some(port);
            Ok(())
        }

        /// Path of the port, if one has been configured.
        pub fn path(&self) -> Option<&str> {
            self.path.as_deref()
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            let port = self
                .port
                .as_mut()
                .ok_or_else(|| not_connected("serial port"))?;
            port.write_all(bytes)?;
            port.flush()
        }

        fn is_open(&self) -> bool {
            self.port.is_some()
        }

        fn close(&mut self) -> io::Result<()> {
            if let Some(mut port) = self.port.take() {
                port.flush()?;
                debug!(path = ?self.path, "Closed Master-8 serial port");
            }
            Ok(())
        }

        fn describe(&self) -> String {
            match &self.path {
                Some(path) => format!("serial port {}", path),
                None => "unconfigured serial port".to_string(),
            }
        }
    }

    impl std::fmt::Debug for SerialTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SerialTransport")
                .field("path", &self.path)
                .field("open", &self.port.is_some())
                .finish()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_unconfigured_port_is_closed() {
            let mut transport = SerialTransport::unconfigured();
            assert!(!transport.is_open());
            assert_eq!(transport.path(), None);
            assert_eq!(transport.describe(), "unconfigured serial port");

            let err = transport.write(b"A 1 E").unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::NotConnected);
            assert!(transport.close().is_ok());
        }

        #[test]
        fn test_default_settings() {
            let settings = SerialSettings::default();
            assert_eq!(settings.baud_rate, 9600);
            assert_eq!(settings.timeout, Duration::from_millis(500));
        }

        #[test]
        fn test_open_missing_port_fails() {
            let err = SerialTransport::open("/dev/does-not-exist-master8", &SerialSettings::default())
                .unwrap_err();
            assert!(err.is_transport());
        }
    }
}

// =============================================================================
// Generic writer
// =============================================================================

/// Adapts any `Write` implementation (a `TcpStream`, a pipe, a file) into a
/// transport. Closing flushes and drops the writer.
#[derive(Debug)]
pub struct IoTransport<W> {
    label: String,
    writer: Option<W>,
}

impl<W: Write + Send> IoTransport<W> {
    /// Wrap an open writer. `label` identifies it in logs.
    pub fn new(label: impl Into<String>, writer: W) -> Self {
        Self {
            label: label.into(),
            writer: Some(writer),
        }
    }

    /// The writer, unless the transport has been closed.
    pub fn get_ref(&self) -> Option<&W> {
        self.writer.as_ref()
    }

    /// Take the writer back, leaving the transport closed.
    pub fn into_inner(self) -> Option<W> {
        self.writer
    }
}

impl<W: Write + Send> Transport for IoTransport<W> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| not_connected(&self.label))?;
        writer.write_all(bytes)?;
        writer.flush()
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            debug!(label = %self.label, "Closed writer transport");
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

// =============================================================================
// Loopback
// =============================================================================

#[derive(Debug)]
struct LoopbackState {
    open: bool,
    messages: Vec<String>,
    fail_next: Option<io::ErrorKind>,
}

/// In-memory transport that records every message written to it.
///
/// Clones share the same record, so a test can keep one handle while the
/// driver owns another.
///
/// # Example
///
/// ```
/// use master8::{LoopbackTransport, Master8};
///
/// let link = LoopbackTransport::new();
/// let mut stim = Master8::new(link.clone());
/// stim.change_paradigm(2).unwrap();
/// assert_eq!(link.messages(), vec!["A 2 E"]);
/// ```
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackTransport {
    /// An open loopback with an empty record.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LoopbackState {
                open: true,
                messages: Vec::new(),
                fail_next: None,
            })),
        }
    }

    /// Every message written so far, in order.
    pub fn messages(&self) -> Vec<String> {
        self.state.lock().messages.clone()
    }

    /// The byte stream as the device would have received it.
    pub fn stream(&self) -> String {
        self.state.lock().messages.concat()
    }

    /// Forget recorded messages.
    pub fn clear(&self) {
        self.state.lock().messages.clear();
    }

    /// Make the next write fail with `kind` without recording anything.
    pub fn fail_next_write(&self, kind: io::ErrorKind) {
        self.state.lock().fail_next = Some(kind);
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LoopbackTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(not_connected("loopback"));
        }
        if let Some(kind) = state.fail_next.take() {
            return Err(io::Error::new(kind, "injected loopback failure"));
        }
        state
            .messages
            .push(String::from_utf8_lossy(bytes).into_owned());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn close(&mut self) -> io::Result<()> {
        self.state.lock().open = false;
        Ok(())
    }

    fn describe(&self) -> String {
        "loop://".to_string()
    }
}
