//! Binance spot market data.
//!
//! Supplies the session with:
//! - historical klines (BinanceDatafeed)
//! - live kline streams (BinanceKlineFeed)

mod config;
mod constants;
mod datafeed;
mod kline_feed;
mod rest_client;
mod websocket_client;

pub use config::BinanceConfig;
pub use constants::*;
pub use datafeed::{parse_kline_rows, BinanceDatafeed};
pub use kline_feed::BinanceKlineFeed;
pub use rest_client::BinanceRestClient;
pub use websocket_client::{BinanceWebSocketClient, WsEventHandler};
