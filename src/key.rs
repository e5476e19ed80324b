//! Master-8 key table and channel modes.
//!
//! The device is driven by the same keys found on its front panel. Over the
//! serial link each key is a single ASCII character; the table below is fixed
//! by the firmware and never extended at runtime.
//!
//! | Key | Char | Key | Char | Key | Char |
//! |-----|------|-----|------|-----|------|
//! | Duration | `D` | Trigger | `G` | ClockReset | `R` |
//! | Interval | `I` | Dc | `C` | Check | `H` |
//! | Delay | `L` | Gate | `T` | ClearDisplay | `Y` |
//! | M | `M` | Off | `O` | Connect | `X` |
//! | Voltage | `V` | Timer | `W` | Disconnect | `Z` |
//! | Jump | `J` | All | `A` | Enter | `E` |
//! | FreeRun | `F` | ClockDisplay | `Q` | Begin | `B` |
//! | Train | `N` | StopWatch | `S` | | |

use std::fmt;
use std::str::FromStr;

use crate::error::{Master8Error, Result};

/// A single Master-8 key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Pulse duration (`D`).
    Duration,
    /// Inter-pulse interval (`I`).
    Interval,
    /// Delay after trigger (`L`).
    Delay,
    /// Number of pulses in a train (`M`).
    M,
    /// Output voltage (`V`).
    Voltage,
    /// Jump / delta-V (`J`).
    Jump,
    /// Free-run mode (`F`).
    FreeRun,
    /// Train mode (`N`).
    Train,
    /// Trigger mode (`G`).
    Trigger,
    /// DC mode (`C`).
    Dc,
    /// Gate mode (`T`).
    Gate,
    /// Off mode (`O`).
    Off,
    /// Timer (`W`).
    Timer,
    /// All channels / paradigm selection (`A`).
    All,
    /// Clock display (`Q`).
    ClockDisplay,
    /// Stop watch (`S`).
    StopWatch,
    /// Clock reset (`R`).
    ClockReset,
    /// Check (`H`).
    Check,
    /// Clear display (`Y`).
    ClearDisplay,
    /// Connect channels (`X`).
    Connect,
    /// Disconnect channels (`Z`).
    Disconnect,
    /// Confirm / commit (`E`).
    Enter,
    /// Begin (`B`).
    Begin,
}

impl Key {
    /// Every key, in front-panel table order.
    pub const ALL: [Key; 23] = [
        Key::Duration,
        Key::Interval,
        Key::Delay,
        Key::M,
        Key::Voltage,
        Key::Jump,
        Key::FreeRun,
        Key::Train,
        Key::Trigger,
        Key::Dc,
        Key::Gate,
        Key::Off,
        Key::Timer,
        Key::All,
        Key::ClockDisplay,
        Key::StopWatch,
        Key::ClockReset,
        Key::Check,
        Key::ClearDisplay,
        Key::Connect,
        Key::Disconnect,
        Key::Enter,
        Key::Begin,
    ];

    /// The character sent over the wire for this key.
    pub const fn as_char(self) -> char {
        match self {
            Key::Duration => 'D',
            Key::Interval => 'I',
            Key::Delay => 'L',
            Key::M => 'M',
            Key::Voltage => 'V',
            Key::Jump => 'J',
            Key::FreeRun => 'F',
            Key::Train => 'N',
            Key::Trigger => 'G',
            Key::Dc => 'C',
            Key::Gate => 'T',
            Key::Off => 'O',
            Key::Timer => 'W',
            Key::All => 'A',
            Key::ClockDisplay => 'Q',
            Key::StopWatch => 'S',
            Key::ClockReset => 'R',
            Key::Check => 'H',
            Key::ClearDisplay => 'Y',
            Key::Connect => 'X',
            Key::Disconnect => 'Z',
            Key::Enter => 'E',
            Key::Begin => 'B',
        }
    }

    /// Look up a key by its wire character.
    pub fn from_char(c: char) -> Option<Key> {
        Key::ALL.into_iter().find(|key| key.as_char() == c)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Parses key names as printed in the Master-8 manuals, including their
/// abbreviations (`DURA`, `FREE`, `TRIG`, `DELTAV`, `CNCT_DSCNCT`, ...).
/// Matching ignores case, and `-` is treated like `_`.
impl FromStr for Key {
    type Err = Master8Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_uppercase().replace('-', "_");
        let key = match name.as_str() {
            "DURA" | "DURATION" => Key::Duration,
            "INTERVAL" => Key::Interval,
            "DELAY" => Key::Delay,
            "M" => Key::M,
            "V" | "VOLTAGE" => Key::Voltage,
            "J" | "JUMP" | "DELTAV" | "DELTA_V" => Key::Jump,
            "FREE" | "FREE_RUN" | "FREERUN" => Key::FreeRun,
            "TRAIN" => Key::Train,
            "TRIG" | "TRIGGER" => Key::Trigger,
            "DC" => Key::Dc,
            "GATE" => Key::Gate,
            "OFF" => Key::Off,
            "TIMER" => Key::Timer,
            "ALL" => Key::All,
            "CLOCK_DISP" | "CLOCK_DISPLAY" => Key::ClockDisplay,
            "STOP_WATCH" | "STOPWATCH" => Key::StopWatch,
            "CLOCK_RESET" => Key::ClockReset,
            "CHECK" => Key::Check,
            "CLEAR_DISP" | "CLEAR_DISPLAY" => Key::ClearDisplay,
            "CONNECT" | "CNCT_DSCNCT" => Key::Connect,
            "DISCONNECT" => Key::Disconnect,
            "ENTER" => Key::Enter,
            "BEGIN" => Key::Begin,
            _ => {
                return Err(Master8Error::invalid(format!(
                    "'{}' is not a Master-8 key name",
                    s
                )))
            }
        };
        Ok(key)
    }
}

/// Triggering behaviour of a channel.
///
/// The order of the variants is the device's mode index order; `index()` and
/// `from_index()` depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    /// Channel disabled.
    Off,
    /// Continuous pulses at the programmed interval.
    FreeRun,
    /// A train of M pulses per trigger.
    Train,
    /// A single pulse per trigger.
    Trigger,
    /// Constant output.
    Dc,
    /// Output follows the gate input.
    Gate,
}

impl ChannelMode {
    /// All modes in index order.
    pub const ALL: [ChannelMode; 6] = [
        ChannelMode::Off,
        ChannelMode::FreeRun,
        ChannelMode::Train,
        ChannelMode::Trigger,
        ChannelMode::Dc,
        ChannelMode::Gate,
    ];

    /// Position of this mode in the device's mode list.
    pub const fn index(self) -> usize {
        match self {
            ChannelMode::Off => 0,
            ChannelMode::FreeRun => 1,
            ChannelMode::Train => 2,
            ChannelMode::Trigger => 3,
            ChannelMode::Dc => 4,
            ChannelMode::Gate => 5,
        }
    }

    /// The mode at `index` in [`ChannelMode::ALL`].
    pub fn from_index(index: usize) -> Option<ChannelMode> {
        ChannelMode::ALL.get(index).copied()
    }

    /// The key that selects this mode.
    pub const fn key(self) -> Key {
        match self {
            ChannelMode::Off => Key::Off,
            ChannelMode::FreeRun => Key::FreeRun,
            ChannelMode::Train => Key::Train,
            ChannelMode::Trigger => Key::Trigger,
            ChannelMode::Dc => Key::Dc,
            ChannelMode::Gate => Key::Gate,
        }
    }

    /// The mode selected by `key`, if it is one of the six mode keys.
    pub fn from_key(key: Key) -> Option<ChannelMode> {
        match key {
            Key::Off => Some(ChannelMode::Off),
            Key::FreeRun => Some(ChannelMode::FreeRun),
            Key::Train => Some(ChannelMode::Train),
            Key::Trigger => Some(ChannelMode::Trigger),
            Key::Dc => Some(ChannelMode::Dc),
            Key::Gate => Some(ChannelMode::Gate),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChannelMode::Off => "off",
            ChannelMode::FreeRun => "free_run",
            ChannelMode::Train => "train",
            ChannelMode::Trigger => "trigger",
            ChannelMode::Dc => "dc",
            ChannelMode::Gate => "gate",
        };
        write!(f, "{}", label)
    }
}

/// A channel mode as callers may spell it: a mode index, a mode key, or the
/// key's wire character.
///
/// ```
/// use master8::{ChannelMode, Key, ModeSelector};
///
/// let by_index = ModeSelector::from(2usize).resolve().unwrap();
/// let by_key = ModeSelector::from(Key::Train).resolve().unwrap();
/// let by_char = ModeSelector::from('N').resolve().unwrap();
/// assert_eq!(by_index, ChannelMode::Train);
/// assert_eq!(by_key, by_index);
/// assert_eq!(by_char, by_index);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSelector {
    /// Index into [`ChannelMode::ALL`].
    Index(usize),
    /// One of the six mode keys.
    Key(Key),
    /// Wire character of one of the six mode keys.
    Char(char),
}

impl ModeSelector {
    /// Resolve to a channel mode, or fail with `InvalidArgument`.
    pub fn resolve(self) -> Result<ChannelMode> {
        let mode = match self {
            ModeSelector::Index(index) => ChannelMode::from_index(index),
            ModeSelector::Key(key) => ChannelMode::from_key(key),
            ModeSelector::Char(c) => Key::from_char(c).and_then(ChannelMode::from_key),
        };
        mode.ok_or_else(|| {
            Master8Error::invalid(format!(
                "{} is neither a mode index (0-5) nor a mode key (O, F, N, G, C, T)",
                self
            ))
        })
    }
}

impl fmt::Display for ModeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeSelector::Index(index) => write!(f, "mode index {}", index),
            ModeSelector::Key(key) => write!(f, "key '{}'", key),
            ModeSelector::Char(c) => write!(f, "key '{}'", c.escape_default()),
        }
    }
}

impl From<usize> for ModeSelector {
    fn from(index: usize) -> Self {
        ModeSelector::Index(index)
    }
}

impl From<Key> for ModeSelector {
    fn from(key: Key) -> Self {
        ModeSelector::Key(key)
    }
}

impl From<char> for ModeSelector {
    fn from(c: char) -> Self {
        ModeSelector::Char(c)
    }
}

impl From<ChannelMode> for ModeSelector {
    fn from(mode: ChannelMode) -> Self {
        ModeSelector::Key(mode.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_table_matches_device() {
        let expected = "DILMVJFNGCTOWAQSRHYXZEB";
        let actual: String = Key::ALL.iter().map(|k| k.as_char()).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_key_chars_are_unique_and_reversible() {
        let chars: HashSet<char> = Key::ALL.iter().map(|k| k.as_char()).collect();
        assert_eq!(chars.len(), Key::ALL.len());

        for key in Key::ALL {
            assert_eq!(Key::from_char(key.as_char()), Some(key));
        }
        assert_eq!(Key::from_char('K'), None);
        assert_eq!(Key::from_char('e'), None);
    }

    #[test]
    fn test_key_names_and_aliases() {
        assert_eq!("DURA".parse::<Key>().unwrap(), Key::Duration);
        assert_eq!("duration".parse::<Key>().unwrap(), Key::Duration);
        assert_eq!("free_run".parse::<Key>().unwrap(), Key::FreeRun);
        assert_eq!("Free-Run".parse::<Key>().unwrap(), Key::FreeRun);
        assert_eq!("DELTAV".parse::<Key>().unwrap(), Key::Jump);
        assert_eq!("CNCT_DSCNCT".parse::<Key>().unwrap(), Key::Connect);
        assert_eq!("trig".parse::<Key>().unwrap(), Key::Trigger);
        assert!("PULSE".parse::<Key>().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_mode_order() {
        let keys: String = ChannelMode::ALL.iter().map(|m| m.key().as_char()).collect();
        assert_eq!(keys, "OFNGCT");

        for (i, mode) in ChannelMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
            assert_eq!(ChannelMode::from_index(i), Some(*mode));
            assert_eq!(ChannelMode::from_key(mode.key()), Some(*mode));
        }
        assert_eq!(ChannelMode::from_index(6), None);
        assert_eq!(ChannelMode::from_key(Key::Enter), None);
    }

    #[test]
    fn test_selector_resolution() {
        assert_eq!(ModeSelector::from(3usize).resolve().unwrap(), ChannelMode::Trigger);
        assert_eq!(ModeSelector::from(Key::Gate).resolve().unwrap(), ChannelMode::Gate);
        assert_eq!(ModeSelector::from('C').resolve().unwrap(), ChannelMode::Dc);
        assert_eq!(
            ModeSelector::from(ChannelMode::FreeRun).resolve().unwrap(),
            ChannelMode::FreeRun
        );
    }

    #[test]
    fn test_selector_rejects_non_modes() {
        for selector in [
            ModeSelector::from(6usize),
            ModeSelector::from(Key::Duration),
            ModeSelector::from('E'),
            ModeSelector::from('n'),
        ] {
            let err = selector.resolve().unwrap_err();
            assert!(err.is_invalid_argument(), "{selector} should be rejected");
        }
    }
}
