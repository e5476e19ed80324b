//! Global subscriber installation.
//!
//! Kept in its own test binary: the global default can only be set once per
//! process, and the unit tests install their own capturing subscriber.

use master8::logging::{self, LoggingConfig, OutputFormat};

#[test]
fn test_init_is_idempotent() {
    let config = LoggingConfig {
        level: "warn".into(),
        format: OutputFormat::Compact,
    };
    assert!(logging::init(&config).is_ok());
    assert!(logging::init(&config).is_ok());

    let err = logging::init(&LoggingConfig {
        level: "nope".into(),
        format: OutputFormat::Pretty,
    })
    .unwrap_err();
    assert!(err.is_configuration());
}
