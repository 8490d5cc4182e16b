//! Historical kline backfill from the Binance REST API.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::trader::constant::Interval;
use crate::trader::datafeed::{BackfillProvider, DEFAULT_BACKFILL_LIMIT};
use crate::trader::object::Bar;
use crate::trader::utility::ms_to_seconds;

use super::config::BinanceConfig;
use super::constants::{KLINES_PATH, MAX_KLINE_LIMIT};
use super::rest_client::BinanceRestClient;

/// Backfill provider reading `/api/v3/klines`
pub struct BinanceDatafeed {
    rest_client: BinanceRestClient,
}

impl BinanceDatafeed {
    pub fn new(config: &BinanceConfig) -> Self {
        Self {
            rest_client: BinanceRestClient::new(config.rest_host(), config.proxy()),
        }
    }

    /// Query parameters for one klines request
    pub fn kline_params(symbol: &str, interval: Interval, limit: usize) -> HashMap<String, String> {
        let limit = if limit == 0 { DEFAULT_BACKFILL_LIMIT } else { limit.min(MAX_KLINE_LIMIT) };

        let mut params = HashMap::new();
        params.insert("symbol".to_string(), symbol.trim().to_uppercase());
        params.insert("interval".to_string(), interval.value().to_string());
        params.insert("limit".to_string(), limit.to_string());
        params
    }
}

#[async_trait]
impl BackfillProvider for BinanceDatafeed {
    async fn fetch(&self, symbol: &str, interval: Interval, limit: usize) -> Result<Vec<Bar>, String> {
        let params = Self::kline_params(symbol, interval, limit);
        let data = self.rest_client.get(KLINES_PATH, &params).await?;
        let bars = parse_kline_rows(&data, Utc::now().timestamp_millis())?;
        info!("Fetched {} bars of {} {}", bars.len(), symbol, interval);
        Ok(bars)
    }
}

fn row_number(row: &[Value], ix: usize) -> Result<f64, String> {
    let value = match row.get(ix) {
        Some(Value::String(s)) => s.parse::<f64>().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };
    value.ok_or_else(|| format!("kline column {} missing or not numeric", ix))
}

fn row_time(row: &[Value], ix: usize) -> Result<i64, String> {
    row.get(ix)
        .and_then(Value::as_i64)
        .ok_or_else(|| format!("kline column {} missing or not an integer", ix))
}

/// Parse a klines response: `[[openTime, o, h, l, c, v, closeTime, ...], ...]`.
///
/// A bar is final when its close time is already in the past.
pub fn parse_kline_rows(data: &Value, now_ms: i64) -> Result<Vec<Bar>, String> {
    let rows = data
        .as_array()
        .ok_or_else(|| format!("Unexpected klines response: {}", data))?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let row = row
                .as_array()
                .ok_or_else(|| format!("kline row {} is not an array", i))?;
            let bar = Bar {
                time: ms_to_seconds(row_time(row, 0)?),
                open: row_number(row, 1)?,
                high: row_number(row, 2)?,
                low: row_number(row, 3)?,
                close: row_number(row, 4)?,
                volume: row_number(row, 5)?,
                is_final: row_time(row, 6)? < now_ms,
            };
            if bar.is_valid() {
                Ok(bar)
            } else {
                Err(format!("kline row {} has negative or non-finite values", i))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_kline_rows() {
        let data = json!([
            [1_700_000_000_000i64, "10.0", "12.0", "9.5", "11.0", "100.5", 1_700_000_059_999i64, "1105.5", 10, "50", "550", "0"],
            [1_700_000_060_000i64, "11.0", "11.5", "10.5", "10.8", "20", 1_700_000_119_999i64, "216", 3, "10", "108", "0"]
        ]);

        let bars = parse_kline_rows(&data, 1_700_000_100_000).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time, 1_700_000_000);
        assert_eq!(bars[0].close, 11.0);
        assert_eq!(bars[0].volume, 100.5);
        assert!(bars[0].is_final);
        assert_eq!(bars[1].time, 1_700_000_060);
        assert!(!bars[1].is_final);
    }

    #[test]
    fn test_parse_kline_rows_rejects_bad_payload() {
        assert!(parse_kline_rows(&json!({"code": -1121, "msg": "Invalid symbol."}), 0).is_err());
        assert!(parse_kline_rows(&json!([[0, "1", "1", "1"]]), 0).is_err());
        assert!(parse_kline_rows(&json!([[0, "1", "1", "1", "x", "1", 59_999]]), 0).is_err());
        assert_eq!(parse_kline_rows(&json!([]), 0), Ok(Vec::new()));
    }

    #[test]
    fn test_kline_params() {
        let params = BinanceDatafeed::kline_params(" btcusdt", Interval::Minute5, 5000);
        assert_eq!(params["symbol"], "BTCUSDT");
        assert_eq!(params["interval"], "5m");
        assert_eq!(params["limit"], "1000");

        let params = BinanceDatafeed::kline_params("ETHUSDT", Interval::Hour, 0);
        assert_eq!(params["limit"], "500");
    }
}
