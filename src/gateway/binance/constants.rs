//! Binance API constants.

use crate::trader::constant::Interval;

/// Spot REST API host (production)
pub const SPOT_REST_HOST: &str = "https://api.binance.com";

/// Spot REST API host (testnet)
pub const SPOT_TESTNET_REST_HOST: &str = "https://testnet.binance.vision";

/// Spot WebSocket host for raw streams (production)
pub const SPOT_WS_HOST: &str = "wss://stream.binance.com:9443/ws/";

/// Spot WebSocket host for raw streams (testnet)
pub const SPOT_TESTNET_WS_HOST: &str = "wss://testnet.binance.vision/ws/";

/// Kline/candlestick endpoint
pub const KLINES_PATH: &str = "/api/v3/klines";

/// Largest page the klines endpoint serves
pub const MAX_KLINE_LIMIT: usize = 1000;

/// Raw stream name for one symbol's klines, e.g. "btcusdt@kline_1m"
pub fn kline_stream_name(symbol: &str, interval: Interval) -> String {
    format!("{}@kline_{}", symbol.trim().to_lowercase(), interval.value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kline_stream_name() {
        assert_eq!(kline_stream_name("BTCUSDT", Interval::Minute), "btcusdt@kline_1m");
        assert_eq!(kline_stream_name(" ethusdt ", Interval::Monthly), "ethusdt@kline_1M");
    }
}
