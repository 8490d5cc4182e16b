//! Datafeed abstraction for loading historical bars.

use async_trait::async_trait;

use super::constant::Interval;
use super::object::Bar;

/// Default number of bars requested by a backfill
pub const DEFAULT_BACKFILL_LIMIT: usize = 500;

/// Source of historical bars for a session backfill.
///
/// Bars must be returned oldest first. Any error is reported to the session
/// as a failed backfill.
#[async_trait]
pub trait BackfillProvider: Send + Sync {
    async fn fetch(&self, symbol: &str, interval: Interval, limit: usize) -> Result<Vec<Bar>, String>;
}

/// Empty datafeed implementation for when no datafeed is configured
pub struct EmptyDatafeed;

impl EmptyDatafeed {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EmptyDatafeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackfillProvider for EmptyDatafeed {
    async fn fetch(&self, symbol: &str, _interval: Interval, _limit: usize) -> Result<Vec<Bar>, String> {
        tracing::warn!("No datafeed configured, cannot backfill {}", symbol);
        Err("Bar backfill failed: no datafeed configured".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_datafeed() {
        let datafeed = EmptyDatafeed::new();
        let result = datafeed.fetch("BTCUSDT", Interval::Minute, DEFAULT_BACKFILL_LIMIT).await;
        assert!(result.is_err());
    }
}
