//! Configuration using Figment
//!
//! Configuration is loaded from:
//! 1. A TOML file (base configuration)
//! 2. Environment variables prefixed with `MASTER8_`, `__` separating levels
//!
//! ```toml
//! [connection]
//! kind = "serial"
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//!
//! [logging]
//! level = "debug"
//! format = "compact"
//! ```
//!
//! `MASTER8_CONNECTION__PORT=/dev/ttyUSB1` overrides the port above.
//!
//! # Example
//! ```no_run
//! use master8::{config::Master8Config, Master8};
//!
//! # fn main() -> master8::Result<()> {
//! let config = Master8Config::load_from("master8.toml")?;
//! config.validate()?;
//! let mut stim = Master8::from_config(&config.connection)?;
//! stim.clear_paradigm()?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Master8Error, Result};
use crate::logging::LoggingConfig;
use crate::transport::{LoopbackTransport, Transport};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "MASTER8_";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Master8Config {
    /// How to reach the device.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the driver reaches the device, tagged by `kind`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionConfig {
    /// A serial port.
    Serial {
        /// Serial port path (e.g., "/dev/ttyUSB0", "COM3")
        port: String,
        /// Baud rate
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        /// Write timeout in milliseconds
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    /// An address string: `loop://`, `serial://<path>` or a bare port path.
    Url {
        /// The address
        url: String,
    },
    /// An in-memory loopback.
    Loopback,
    /// A serial transport with no port, opened later by the caller.
    #[default]
    Unconfigured,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_timeout_ms() -> u64 {
    500
}

impl ConnectionConfig {
    /// Turn an address string into a connection description.
    ///
    /// # Errors
    /// `Configuration` for empty addresses and unknown schemes.
    pub fn parse_address(address: &str) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Master8Error::Configuration(
                "connection address is empty".into(),
            ));
        }

        match address.split_once("://") {
            Some(("loop", _)) => Ok(ConnectionConfig::Loopback),
            Some(("serial", path)) if !path.is_empty() => Ok(ConnectionConfig::Serial {
                port: path.to_string(),
                baud_rate: default_baud_rate(),
                timeout_ms: default_timeout_ms(),
            }),
            Some((scheme, _)) => Err(Master8Error::Configuration(format!(
                "unsupported connection address '{}' (scheme '{}')",
                address, scheme
            ))),
            None => Ok(ConnectionConfig::Serial {
                port: address.to_string(),
                baud_rate: default_baud_rate(),
                timeout_ms: default_timeout_ms(),
            }),
        }
    }

    /// Semantic checks that parsing cannot express.
    pub fn validate(&self) -> Result<()> {
        match self {
            ConnectionConfig::Serial {
                port, baud_rate, ..
            } => {
                if port.trim().is_empty() {
                    return Err(Master8Error::Configuration(
                        "serial port path cannot be empty".into(),
                    ));
                }
                if *baud_rate == 0 {
                    return Err(Master8Error::Configuration(
                        "baud_rate must be greater than 0".into(),
                    ));
                }
                Ok(())
            }
            ConnectionConfig::Url { url } => Self::parse_address(url)?.validate(),
            ConnectionConfig::Loopback | ConnectionConfig::Unconfigured => Ok(()),
        }
    }

    /// Open the described connection.
    pub fn connect(&self) -> Result<Box<dyn Transport>> {
        self.validate()?;
        match self {
            ConnectionConfig::Url { url } => Self::parse_address(url)?.connect(),
            ConnectionConfig::Loopback => Ok(Box::new(LoopbackTransport::new())),
            ConnectionConfig::Serial {
                port,
                baud_rate,
                timeout_ms,
            } => open_serial(port, *baud_rate, *timeout_ms),
            ConnectionConfig::Unconfigured => unconfigured_serial(),
        }
    }
}

#[cfg(feature = "instrument_serial")]
fn open_serial(port: &str, baud_rate: u32, timeout_ms: u64) -> Result<Box<dyn Transport>> {
    use crate::transport::{SerialSettings, SerialTransport};

    let settings = SerialSettings {
        baud_rate,
        timeout: std::time::Duration::from_millis(timeout_ms),
    };
    Ok(Box::new(SerialTransport::open(port, &settings)?))
}

#[cfg(not(feature = "instrument_serial"))]
fn open_serial(_port: &str, _baud_rate: u32, _timeout_ms: u64) -> Result<Box<dyn Transport>> {
    Err(Master8Error::SerialFeatureDisabled)
}

#[cfg(feature = "instrument_serial")]
fn unconfigured_serial() -> Result<Box<dyn Transport>> {
    Ok(Box::new(crate::transport::SerialTransport::unconfigured()))
}

#[cfg(not(feature = "instrument_serial"))]
fn unconfigured_serial() -> Result<Box<dyn Transport>> {
    Err(Master8Error::SerialFeatureDisabled)
}

impl Master8Config {
    /// Load from `path`, then apply `MASTER8_` environment overrides.
    /// A missing file leaves the defaults in place.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::figment(path).extract()?)
    }

    /// The provider stack `load_from` extracts from.
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(Master8Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source)
            .map_err(|e| Master8Error::Configuration(format!("invalid TOML configuration: {}", e)))
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;
        self.logging.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_forms() {
        assert_eq!(
            ConnectionConfig::parse_address("loop://").unwrap(),
            ConnectionConfig::Loopback
        );
        assert_eq!(
            ConnectionConfig::parse_address("/dev/ttyUSB0").unwrap(),
            ConnectionConfig::Serial {
                port: "/dev/ttyUSB0".into(),
                baud_rate: 9600,
                timeout_ms: 500,
            }
        );
        assert_eq!(
            ConnectionConfig::parse_address("serial://COM3").unwrap(),
            ConnectionConfig::Serial {
                port: "COM3".into(),
                baud_rate: 9600,
                timeout_ms: 500,
            }
        );
    }

    #[test]
    fn test_parse_address_rejects_unknown() {
        for address in ["", "   ", "socket://localhost:7777", "rfc2217://host", "serial://"] {
            let err = ConnectionConfig::parse_address(address).unwrap_err();
            assert!(err.is_configuration(), "'{}' should be rejected", address);
        }
    }

    #[test]
    fn test_connect_loopback() {
        let transport = ConnectionConfig::Loopback.connect().unwrap();
        assert!(transport.is_open());
        assert_eq!(transport.describe(), "loop://");

        let transport = ConnectionConfig::Url {
            url: "loop://".into(),
        }
        .connect()
        .unwrap();
        assert!(transport.is_open());
    }

    #[test]
    fn test_validate_serial() {
        let empty = ConnectionConfig::Serial {
            port: " ".into(),
            baud_rate: 9600,
            timeout_ms: 500,
        };
        assert!(empty.validate().is_err());

        let zero_baud = ConnectionConfig::Serial {
            port: "/dev/ttyUSB0".into(),
            baud_rate: 0,
            timeout_ms: 500,
        };
        assert!(zero_baud.validate().is_err());
        match zero_baud.connect() {
            Err(err) => assert!(err.is_configuration()),
            Ok(_) => panic!("zero baud rate must not connect"),
        }
    }

    #[test]
    fn test_from_toml_str() {
        let config = Master8Config::from_toml_str(
            r#"
            [connection]
            kind = "serial"
            port = "/dev/ttyUSB3"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.connection,
            ConnectionConfig::Serial {
                port: "/dev/ttyUSB3".into(),
                baud_rate: 9600,
                timeout_ms: 500,
            }
        );
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = Master8Config::from_toml_str(
            r#"
            [connection]
            kind = "bluetooth"
            "#,
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_default_is_unconfigured() {
        let config = Master8Config::default();
        assert_eq!(config.connection, ConnectionConfig::Unconfigured);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "master8.toml",
                r#"
                [connection]
                kind = "serial"
                port = "/dev/ttyUSB0"

                [logging]
                level = "debug"
                "#,
            )?;
            jail.set_env("MASTER8_CONNECTION__PORT", "/dev/ttyUSB9");
            jail.set_env("MASTER8_CONNECTION__BAUD_RATE", "19200");

            let config = Master8Config::load_from("master8.toml").map_err(|e| e.to_string())?;
            assert_eq!(
                config.connection,
                ConnectionConfig::Serial {
                    port: "/dev/ttyUSB9".into(),
                    baud_rate: 19200,
                    timeout_ms: 500,
                }
            );
            assert_eq!(config.logging.level, "debug");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Master8Config::load_from("absent.toml").map_err(|e| e.to_string())?;
            assert_eq!(config, Master8Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_env_selects_loopback() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MASTER8_CONNECTION__KIND", "loopback");
            let config = Master8Config::load_from("absent.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.connection, ConnectionConfig::Loopback);
            Ok(())
        });
    }
}
