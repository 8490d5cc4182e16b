//! Chart-side state of a session: the bar series, its indicators and the
//! items published to the renderer.
//!
//! This module provides:
//! - `BarStore` - Ordered bar series with append/amend merge
//! - `sma` / `ema` - Pure moving average calculators
//! - `IndicatorSet` - Toggleable indicator subscriptions
//! - `ChartEvent` - Candle, volume and line items for the renderer

mod indicator;
mod item;
mod manager;

pub use indicator::*;
pub use item::{CandleItem, ChartEvent, LineDelta, LineItem, LinePoint, VolumeItem};
pub use manager::BarStore;
