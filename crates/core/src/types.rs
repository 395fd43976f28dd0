//! Shared domain types for the pairs execution loop.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the side that unwinds this one.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Raw signal value outside `{-1, 0, 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("signal value must be -1, 0 or 1, got {0}")]
pub struct InvalidSignal(pub i8);

/// Discrete trade signal emitted by the spread model.
///
/// Serialized as the integers `1`, `-1` and `0` so it round-trips through the
/// model's spread files unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum SignalValue {
    /// +1: long the first leg, short the second.
    Long,
    /// -1: short the first leg, long the second.
    Short,
    /// 0: no edge, flatten any open hedge.
    Neutral,
}

impl SignalValue {
    /// All signal values, in `+1, -1, 0` order.
    pub const ALL: [Self; 3] = [Self::Long, Self::Short, Self::Neutral];

    /// Human-readable label used in CLI output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Long => "Long",
            Self::Short => "Short",
            Self::Neutral => "Neutral",
        }
    }
}

impl TryFrom<i8> for SignalValue {
    type Error = InvalidSignal;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Long),
            -1 => Ok(Self::Short),
            0 => Ok(Self::Neutral),
            other => Err(InvalidSignal(other)),
        }
    }
}

impl From<SignalValue> for i8 {
    fn from(value: SignalValue) -> Self {
        match value {
            SignalValue::Long => 1,
            SignalValue::Short => -1,
            SignalValue::Neutral => 0,
        }
    }
}

impl std::fmt::Display for SignalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Latest signal for a pair, as reported by the signal provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub value: SignalValue,
    /// Hedge ratio the cointegration model currently estimates.
    pub hedge_ratio: Decimal,
    /// Timestamp of the spread observation that produced the signal.
    pub as_of: DateTime<Utc>,
}

/// Ordered pair of two distinct instruments.
///
/// The first instrument is the reference leg; the hedge ratio scales the second.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InstrumentPair {
    first: String,
    second: String,
}

impl InstrumentPair {
    /// Builds a pair from two identifiers, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if either identifier is empty or both name the
    /// same instrument (case-insensitive).
    pub fn new(first: impl AsRef<str>, second: impl AsRef<str>) -> Result<Self, ConfigError> {
        let first = first.as_ref().trim();
        let second = second.as_ref().trim();

        if first.is_empty() || second.is_empty() {
            return Err(ConfigError::EmptyInstrument);
        }
        if first.eq_ignore_ascii_case(second) {
            return Err(ConfigError::DuplicateInstrument(first.to_string()));
        }

        Ok(Self {
            first: first.to_string(),
            second: second.to_string(),
        })
    }

    /// Builds a pair from a list that must contain exactly two identifiers.
    ///
    /// # Errors
    /// Returns [`ConfigError::PairArity`] for any other length, plus the
    /// errors of [`InstrumentPair::new`].
    pub fn from_list<S: AsRef<str>>(symbols: &[S]) -> Result<Self, ConfigError> {
        match symbols {
            [first, second] => Self::new(first, second),
            other => Err(ConfigError::PairArity(other.len())),
        }
    }

    #[must_use]
    pub fn first(&self) -> &str {
        &self.first
    }

    #[must_use]
    pub fn second(&self) -> &str {
        &self.second
    }

    /// Both legs, first leg first.
    #[must_use]
    pub fn legs(&self) -> [&str; 2] {
        [self.first.as_str(), self.second.as_str()]
    }
}

impl std::fmt::Display for InstrumentPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.first, self.second)
    }
}

/// Broker acknowledgement of a filled market order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub fill_price: Decimal,
    pub filled_at: DateTime<Utc>,
}
