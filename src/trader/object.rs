//! Basic data structures shared by the session components.

use serde::{Deserialize, Serialize};

use super::constant::Interval;

/// One OHLCV bucket of the active instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bucket start, seconds since epoch
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Cumulative volume of the bucket so far
    pub volume: f64,
    /// Upstream will never amend this bucket again
    #[serde(default)]
    pub is_final: bool,
}

impl Bar {
    /// Create a bar with every price set to `price` and no volume
    pub fn flat(time: i64, price: f64) -> Self {
        Self {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
            is_final: false,
        }
    }

    /// True when the bucket closed at or above its open.
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }

    /// All numeric fields are finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Result of merging a streamed bar into the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyOutcome {
    /// A new bucket was started
    Appended,
    /// The still-open last bucket was overwritten
    Amended,
}

/// The (symbol, interval) pair a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub interval: Interval,
}

impl Instrument {
    /// Symbols are trimmed and upper-cased.
    pub fn new(symbol: &str, interval: Interval) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            interval,
        }
    }

    /// Get "SYMBOL@interval" key used in logs
    pub fn key(&self) -> String {
        format!("{}@{}", self.symbol, self.interval.value())
    }
}
