//! Signal strength readings and their display tiers
//!
//! Thresholds (dBm): strong >= -50, good >= -60, moderate >= -70, weak below
//! that. A missing reading is its own tier and sorts below every real value.

use std::cmp::Ordering;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Text stored in the device file when no reading exists
pub const UNAVAILABLE_TEXT: &str = "N/A";

pub const STRONG_THRESHOLD: i16 = -50;
pub const GOOD_THRESHOLD: i16 = -60;
pub const MODERATE_THRESHOLD: i16 = -70;

lazy_static! {
    /// `0xffffffc4 (-60)` style readings carry the decimal value in parentheses
    static ref PARENTHESIZED_DBM: Regex = Regex::new(r"\((-?\d+)\)").unwrap();
}

/// A received signal strength reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rssi {
    Dbm(i16),
    #[default]
    Unavailable,
}

impl Rssi {
    /// Interpret the text a discovery tool printed for a signal reading
    ///
    /// Accepts `-60`, `0xffffffc4 (-60)`, `0xffffffc4` and `N/A`. Anything
    /// else, including values outside the `i16` range, is unavailable.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();

        if let Some(caps) = PARENTHESIZED_DBM.captures(text) {
            return caps[1].parse().map(Rssi::Dbm).unwrap_or(Rssi::Unavailable);
        }

        if let Ok(value) = text.parse::<i16>() {
            return Rssi::Dbm(value);
        }

        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            // bluetoothctl prints the raw two's complement value
            if let Ok(raw) = u32::from_str_radix(hex, 16) {
                if let Ok(value) = i16::try_from(raw as i32) {
                    return Rssi::Dbm(value);
                }
            }
        }

        Rssi::Unavailable
    }

    pub fn tier(&self) -> SignalTier {
        classify(*self)
    }
}

impl Ord for Rssi {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Rssi::Dbm(a), Rssi::Dbm(b)) => a.cmp(b),
            (Rssi::Dbm(_), Rssi::Unavailable) => Ordering::Greater,
            (Rssi::Unavailable, Rssi::Dbm(_)) => Ordering::Less,
            (Rssi::Unavailable, Rssi::Unavailable) => Ordering::Equal,
        }
    }
}

impl PartialOrd for Rssi {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Rssi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rssi::Dbm(value) => write!(f, "{}", value),
            Rssi::Unavailable => f.write_str(UNAVAILABLE_TEXT),
        }
    }
}

// The device file stores readings as strings: "-60" or "N/A".
impl Serialize for Rssi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rssi {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Float(f64),
            Text(String),
            Null(()),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(value) => i16::try_from(value).map(Rssi::Dbm).unwrap_or(Rssi::Unavailable),
            // Hand-edited files may carry "-60.0"; rounds to the nearest dBm
            Raw::Float(value) => {
                let rounded = value.round();
                if rounded.is_finite() && (i16::MIN as f64..=i16::MAX as f64).contains(&rounded) {
                    Rssi::Dbm(rounded as i16)
                } else {
                    Rssi::Unavailable
                }
            }
            Raw::Text(text) => Rssi::from_text(&text),
            Raw::Null(()) => Rssi::Unavailable,
        })
    }
}

/// Display tier for a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalTier {
    /// No reading; ranks below every real tier
    Unavailable,
    Weak,
    Moderate,
    Good,
    Strong,
}

impl SignalTier {
    pub fn label(&self) -> &'static str {
        match self {
            SignalTier::Strong => "strong",
            SignalTier::Good => "good",
            SignalTier::Moderate => "moderate",
            SignalTier::Weak => "weak",
            SignalTier::Unavailable => "unavailable",
        }
    }

    /// ANSI escape used by the terminal viewer
    pub fn ansi_code(&self) -> &'static str {
        match self {
            SignalTier::Strong => "\x1B[92m",
            SignalTier::Good => "\x1B[93m",
            SignalTier::Moderate => "\x1B[33m",
            SignalTier::Weak => "\x1B[91m",
            SignalTier::Unavailable => "\x1B[90m",
        }
    }
}

impl fmt::Display for SignalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a reading to its display tier
pub fn classify(rssi: Rssi) -> SignalTier {
    match rssi {
        Rssi::Unavailable => SignalTier::Unavailable,
        Rssi::Dbm(value) if value >= STRONG_THRESHOLD => SignalTier::Strong,
        Rssi::Dbm(value) if value >= GOOD_THRESHOLD => SignalTier::Good,
        Rssi::Dbm(value) if value >= MODERATE_THRESHOLD => SignalTier::Moderate,
        Rssi::Dbm(_) => SignalTier::Weak,
    }
}
