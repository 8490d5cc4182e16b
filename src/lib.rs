//! Kline Session - a live OHLCV bar series with moving average indicators
//!
//! This crate keeps one instrument's candlestick series in sync with two
//! sources:
//!
//! - a one-shot historical backfill (`BackfillProvider`)
//! - a continuous live update stream (`FeedConnector`)
//!
//! Streamed updates either start a new bar or amend the still-open last one.
//! SMA and EMA lines are kept in step with the series, recomputing only the
//! newest point per update.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kline_session::gateway::binance::{BinanceConfig, BinanceDatafeed, BinanceKlineFeed};
//! use kline_session::trader::{Interval, SessionConfig, SessionController};
//! use kline_session::chart::IndicatorKind;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = BinanceConfig::default();
//!     let (session, mut events) = SessionController::new(
//!         Arc::new(BinanceDatafeed::new(&config)),
//!         Arc::new(BinanceKlineFeed::new(config)),
//!         SessionConfig::default(),
//!     );
//!     let (handle, _task) = session.spawn();
//!     handle.set_instrument("BTCUSDT", Interval::Minute).unwrap();
//!     handle.toggle_indicator(IndicatorKind::Ema).unwrap();
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

pub mod chart;
pub mod error;
pub mod gateway;
pub mod trader;

// Re-export commonly used types
pub use chart::{BarStore, ChartEvent, IndicatorKind, IndicatorSet};
pub use error::{BarError, BarResult};
pub use trader::{
    // Data objects
    ApplyOutcome, Bar, Instrument, Interval,
    // Session
    SessionCommand, SessionConfig, SessionController, SessionHandle, SessionState, StreamReconciler,
    // Collaborators
    BackfillProvider, FeedConnection, FeedConnector, FeedEvent, FeedEventSender,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
