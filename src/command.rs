//! Wire tokens and argument validation.
//!
//! A Master-8 command is a run of tokens joined by single spaces. This module
//! holds the token type, the validated channel/paradigm identifiers and the
//! numeric formatting rules the device expects.

use std::fmt;

use crate::error::{Master8Error, Result};
use crate::key::Key;

/// Lowest channel and paradigm number.
pub const FIRST_SLOT: u8 = 1;
/// Highest channel and paradigm number.
pub const LAST_SLOT: u8 = 8;

/// Shortest pulse duration the device accepts, in seconds.
pub const MIN_DURATION: f64 = 40e-6;
/// Shortest inter-pulse interval, in seconds.
pub const MIN_INTERVAL: f64 = 60e-6;
/// Shortest trigger delay, in seconds.
pub const MIN_DELAY: f64 = 100e-6;
/// Longest time value the front panel can represent, in seconds.
pub const MAX_TIME: f64 = 3999.0;
/// Fractional digits sent for time values (microsecond resolution).
pub const INTERVAL_PRECISION: usize = 6;

/// Output voltage limit, in volts, for either polarity.
pub const MAX_VOLTAGE: f64 = 12.7;
/// Fractional digits sent for voltages (0.1 V resolution).
pub const VOLTAGE_PRECISION: usize = 1;

/// One space-separated element of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A device key.
    Key(Key),
    /// An unsigned integer, written in decimal.
    Number(u32),
    /// The sign key for negative voltages.
    Minus,
    /// Pre-formatted text, written verbatim.
    Literal(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Key(key) => write!(f, "{}", key),
            Token::Number(n) => write!(f, "{}", n),
            Token::Minus => f.write_str("-"),
            Token::Literal(text) => f.write_str(text),
        }
    }
}

impl From<Key> for Token {
    fn from(key: Key) -> Self {
        Token::Key(key)
    }
}

impl From<u32> for Token {
    fn from(n: u32) -> Self {
        Token::Number(n)
    }
}

impl From<u8> for Token {
    fn from(n: u8) -> Self {
        Token::Number(u32::from(n))
    }
}

impl From<Channel> for Token {
    fn from(channel: Channel) -> Self {
        Token::Number(u32::from(channel.get()))
    }
}

impl From<Paradigm> for Token {
    fn from(paradigm: Paradigm) -> Self {
        Token::Number(u32::from(paradigm.get()))
    }
}

impl From<String> for Token {
    fn from(text: String) -> Self {
        Token::Literal(text)
    }
}

impl From<&str> for Token {
    fn from(text: &str) -> Self {
        Token::Literal(text.to_string())
    }
}

/// Join tokens into the message written to the link.
pub fn render<'a, I>(tokens: I) -> String
where
    I: IntoIterator<Item = &'a Token>,
{
    tokens
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn check_slot(kind: &str, value: u8) -> Result<u8> {
    if (FIRST_SLOT..=LAST_SLOT).contains(&value) {
        Ok(value)
    } else {
        Err(Master8Error::invalid(format!(
            "{} {} is outside {}-{}",
            kind, value, FIRST_SLOT, LAST_SLOT
        )))
    }
}

/// One of the eight output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Validate a channel number.
    pub fn new(channel: u8) -> Result<Self> {
        check_slot("channel", channel).map(Channel)
    }

    /// The channel number, 1-8.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Channel {
    type Error = Master8Error;

    fn try_from(value: u8) -> Result<Self> {
        Channel::new(value)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the eight stored program slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Paradigm(u8);

impl Paradigm {
    /// Validate a paradigm number.
    pub fn new(paradigm: u8) -> Result<Self> {
        check_slot("paradigm", paradigm).map(Paradigm)
    }

    /// The paradigm number, 1-8.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Paradigm {
    type Error = Master8Error;

    fn try_from(value: u8) -> Result<Self> {
        Paradigm::new(value)
    }
}

impl fmt::Display for Paradigm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive limits for a numeric value. Either side may be disabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Smallest accepted value, if any.
    pub min: Option<f64>,
    /// Largest accepted value, if any.
    pub max: Option<f64>,
}

impl Bounds {
    /// No limits.
    pub const UNBOUNDED: Bounds = Bounds {
        min: None,
        max: None,
    };

    /// Limits of a bare time value on the front panel.
    pub const INTERVAL_DEFAULT: Bounds = Bounds {
        min: Some(0.0),
        max: Some(MAX_TIME),
    };

    /// Output voltage range.
    pub const VOLTAGE: Bounds = Bounds {
        min: Some(-MAX_VOLTAGE),
        max: Some(MAX_VOLTAGE),
    };

    /// Both limits.
    pub const fn between(min: f64, max: f64) -> Self {
        Bounds {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Lower limit only.
    pub const fn at_least(min: f64) -> Self {
        Bounds {
            min: Some(min),
            max: None,
        }
    }

    /// Upper limit only.
    pub const fn at_most(max: f64) -> Self {
        Bounds {
            min: None,
            max: Some(max),
        }
    }

    /// Check `value` against the enabled limits. `what` names the value in
    /// the error message.
    pub fn check(&self, what: &str, value: f64) -> Result<f64> {
        if !value.is_finite() {
            return Err(Master8Error::invalid(format!(
                "{} {} is not a finite number",
                what, value
            )));
        }
        if let Some(min) = self.min {
            if value < min {
                return Err(Master8Error::invalid(format!(
                    "{} {} is below the minimum {}",
                    what, value, min
                )));
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(Master8Error::invalid(format!(
                    "{} {} is above the maximum {}",
                    what, value, max
                )));
            }
        }
        Ok(value)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::INTERVAL_DEFAULT
    }
}

/// Format `value` with `precision` fractional digits, then drop trailing
/// zeros and a dangling decimal point.
///
/// ```
/// use master8::command::format_decimal;
///
/// assert_eq!(format_decimal(0.000040, 6), "0.00004");
/// assert_eq!(format_decimal(1.0, 6), "1");
/// assert_eq!(format_decimal(1.23, 6), "1.23");
/// ```
pub fn format_decimal(value: f64, precision: usize) -> String {
    let fixed = format!("{:.*}", precision, value);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    // Tiny negative values round to "-0".
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Tokens of a time entry: `<value> E 0 E`.
pub(crate) fn interval_tokens(value: f64, bounds: Bounds, precision: usize) -> Result<Vec<Token>> {
    let value = bounds.check("time value", value)?;
    Ok(vec![
        Token::Literal(format_decimal(value, precision)),
        Token::Key(Key::Enter),
        Token::Number(0),
        Token::Key(Key::Enter),
    ])
}

/// Messages of a voltage entry: magnitude and ENTER, then the sign key and a
/// second ENTER for negative values.
pub(crate) fn voltage_messages(
    value: f64,
    bounds: Bounds,
    precision: usize,
) -> Result<Vec<Vec<Token>>> {
    let value = bounds.check("voltage", value)?;
    let mut messages = vec![vec![
        Token::Literal(format_decimal(value.abs(), precision)),
        Token::Key(Key::Enter),
    ]];
    if value < 0.0 {
        messages.push(vec![Token::Minus]);
        messages.push(vec![Token::Key(Key::Enter)]);
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_joins_with_single_space() {
        let tokens = vec![
            Token::Key(Key::All),
            Token::Number(3),
            Token::Key(Key::Enter),
        ];
        assert_eq!(render(&tokens), "A 3 E");
        assert_eq!(render(&[Token::Minus]), "-");
        assert_eq!(render(&Vec::<Token>::new()), "");
    }

    #[test]
    fn test_slots_accept_one_through_eight() {
        for n in 1..=8u8 {
            assert_eq!(Channel::new(n).unwrap().get(), n);
            assert_eq!(Paradigm::new(n).unwrap().get(), n);
        }
        for n in [0u8, 9, 255] {
            assert!(Channel::new(n).unwrap_err().is_invalid_argument());
            assert!(Paradigm::try_from(n).unwrap_err().is_invalid_argument());
        }
    }

    #[test]
    fn test_slot_error_names_the_argument() {
        let err = Paradigm::new(9).unwrap_err();
        assert!(err.to_string().contains("paradigm 9"));
    }

    #[test]
    fn test_format_decimal_strips_zeros() {
        assert_eq!(format_decimal(0.000040, 6), "0.00004");
        assert_eq!(format_decimal(1.000000, 6), "1");
        assert_eq!(format_decimal(1.230000, 6), "1.23");
        assert_eq!(format_decimal(0.5, 6), "0.5");
        assert_eq!(format_decimal(3999.0, 6), "3999");
        assert_eq!(format_decimal(0.0, 6), "0");
        assert_eq!(format_decimal(10.0, 0), "10");
        assert_eq!(format_decimal(5.04, 1), "5");
        assert_eq!(format_decimal(12.7, 1), "12.7");
        assert_eq!(format_decimal(-1e-9, 6), "0");
    }

    #[test]
    fn test_format_decimal_truncates_to_precision() {
        assert_eq!(format_decimal(0.0000401, 6), "0.00004");
        assert_eq!(format_decimal(1.5e-7, 6), "0");
    }

    #[test]
    fn test_bounds() {
        let bounds = Bounds::at_least(MIN_DURATION);
        assert!(bounds.check("duration", 40e-6).is_ok());
        assert!(bounds.check("duration", 1e6).is_ok());
        assert!(bounds.check("duration", 39e-6).is_err());

        let bounds = Bounds::at_most(1.0);
        assert!(bounds.check("x", -100.0).is_ok());
        assert!(bounds.check("x", 1.5).is_err());

        assert!(Bounds::VOLTAGE.check("voltage", -12.7).is_ok());
        assert!(Bounds::VOLTAGE.check("voltage", 12.8).is_err());
        assert!(Bounds::between(0.0, 1.0).check("x", 0.5).is_ok());
        assert!(Bounds::UNBOUNDED.check("x", -1e12).is_ok());
    }

    #[test]
    fn test_bounds_reject_non_finite() {
        assert!(Bounds::UNBOUNDED.check("x", f64::NAN).is_err());
        assert!(Bounds::UNBOUNDED.check("x", f64::INFINITY).is_err());
    }

    #[test]
    fn test_interval_tokens() {
        let tokens = interval_tokens(0.00004, Bounds::at_least(MIN_DURATION), 6).unwrap();
        assert_eq!(render(&tokens), "0.00004 E 0 E");
        assert!(interval_tokens(39e-6, Bounds::at_least(MIN_DURATION), 6).is_err());
    }

    #[test]
    fn test_voltage_messages() {
        let negative = voltage_messages(-5.0, Bounds::VOLTAGE, VOLTAGE_PRECISION).unwrap();
        let rendered: Vec<String> = negative.iter().map(|m| render(m)).collect();
        assert_eq!(rendered, vec!["5 E", "-", "E"]);

        let positive = voltage_messages(5.0, Bounds::VOLTAGE, VOLTAGE_PRECISION).unwrap();
        let rendered: Vec<String> = positive.iter().map(|m| render(m)).collect();
        assert_eq!(rendered, vec!["5 E"]);

        let fractional = voltage_messages(-0.26, Bounds::VOLTAGE, VOLTAGE_PRECISION).unwrap();
        assert_eq!(render(&fractional[0]), "0.3 E");
    }
}
