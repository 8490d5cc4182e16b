//! Gateway module - exchange adapters.
//!
//! - **binance**: Binance spot klines (REST backfill and WebSocket stream)

pub mod binance;

// Re-exports
pub use binance::{BinanceConfig, BinanceDatafeed, BinanceKlineFeed};
