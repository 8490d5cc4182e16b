//! Constants used across the kline session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Interval of bar data, named after the Binance kline intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// 1 second
    Second,
    /// 1 minute
    Minute,
    /// 3 minutes
    Minute3,
    /// 5 minutes
    Minute5,
    /// 15 minutes
    Minute15,
    /// 30 minutes
    Minute30,
    /// 1 hour
    Hour,
    /// 2 hours
    Hour2,
    /// 4 hours
    Hour4,
    /// 6 hours
    Hour6,
    /// 8 hours
    Hour8,
    /// 12 hours
    Hour12,
    /// Daily
    Daily,
    /// 3 days
    Daily3,
    /// Weekly
    Weekly,
    /// Monthly
    Monthly,
}

impl Interval {
    /// Get interval value string
    pub fn value(&self) -> &'static str {
        match self {
            Interval::Second => "1s",
            Interval::Minute => "1m",
            Interval::Minute3 => "3m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Minute30 => "30m",
            Interval::Hour => "1h",
            Interval::Hour2 => "2h",
            Interval::Hour4 => "4h",
            Interval::Hour6 => "6h",
            Interval::Hour8 => "8h",
            Interval::Hour12 => "12h",
            Interval::Daily => "1d",
            Interval::Daily3 => "3d",
            Interval::Weekly => "1w",
            Interval::Monthly => "1M",
        }
    }

    /// Get all intervals for selection
    pub fn all() -> Vec<Interval> {
        vec![
            Interval::Second,
            Interval::Minute,
            Interval::Minute3,
            Interval::Minute5,
            Interval::Minute15,
            Interval::Minute30,
            Interval::Hour,
            Interval::Hour2,
            Interval::Hour4,
            Interval::Hour6,
            Interval::Hour8,
            Interval::Hour12,
            Interval::Daily,
            Interval::Daily3,
            Interval::Weekly,
            Interval::Monthly,
        ]
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Interval::all()
            .into_iter()
            .find(|interval| interval.value() == s)
            .ok_or_else(|| format!("Unknown interval: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_parse() {
        assert_eq!("1m".parse::<Interval>(), Ok(Interval::Minute));
        assert_eq!(" 4h ".parse::<Interval>(), Ok(Interval::Hour4));
        assert_eq!("1M".parse::<Interval>(), Ok(Interval::Monthly));
        assert!("7m".parse::<Interval>().is_err());
    }

    #[test]
    fn test_interval_value_is_unique() {
        let all = Interval::all();
        for interval in &all {
            assert_eq!(interval.value().parse::<Interval>(), Ok(*interval));
        }
    }
}
