//! Kline Session - main application entry point
//!
//! Streams one Binance instrument's klines into a live bar series and logs
//! every chart event until Ctrl-C.

use std::error::Error;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use kline_session::chart::{ChartEvent, IndicatorKind, LineDelta};
use kline_session::gateway::binance::{BinanceConfig, BinanceDatafeed, BinanceKlineFeed};
use kline_session::trader::{init_logger, Interval, SessionConfig, SessionController, SETTINGS};

/// Indicators listed in `indicator.active`, e.g. "sma,ema"
fn active_indicators(value: &str) -> Vec<IndicatorKind> {
    let mut kinds = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match name.parse::<IndicatorKind>() {
            Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Ok(_) => {}
            Err(e) => warn!("{}", e),
        }
    }
    kinds
}

fn log_event(event: &ChartEvent) {
    match event {
        ChartEvent::State(state) => info!("Session state: {:?}", state),
        ChartEvent::History { instrument, candles, .. } => {
            info!("History loaded: {} ({} bars)", instrument.key(), candles.len());
        }
        ChartEvent::Bar { candle, volume, outcome } => {
            debug!(
                "{:?} t={} o={} h={} l={} c={} v={}",
                outcome, candle.time, candle.open, candle.high, candle.low, candle.close, volume.value
            );
        }
        ChartEvent::Indicator(item) => match &item.delta {
            LineDelta::Full(points) => debug!("{:?}{} redrawn ({} points)", item.kind, item.window, points.len()),
            LineDelta::Last(point) => debug!("{:?}{} t={} {:?}", item.kind, item.window, point.time, point.value),
            LineDelta::Cleared => info!("{:?}{} cleared", item.kind, item.window),
        },
        ChartEvent::Connection(status) => info!("Feed status: {:?}", status),
        ChartEvent::LoadFailed(e) => warn!("Load failed: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logger();

    info!("Starting Kline Session {}", kline_session::VERSION);

    let symbol = SETTINGS.get_string("session.symbol").unwrap_or_else(|| "BTCUSDT".to_string());
    let interval = SETTINGS
        .get_string("session.interval")
        .and_then(|s| match s.parse::<Interval>() {
            Ok(interval) => Some(interval),
            Err(e) => {
                warn!("{}, using 1m", e);
                None
            }
        })
        .unwrap_or(Interval::Minute);

    let binance = BinanceConfig::from_settings(&SETTINGS);
    let (session, mut events) = SessionController::new(
        Arc::new(BinanceDatafeed::new(&binance)),
        Arc::new(BinanceKlineFeed::new(binance)),
        SessionConfig::from_settings(&SETTINGS),
    );
    let (handle, task) = session.spawn();

    handle.set_instrument(symbol, interval)?;
    for kind in active_indicators(&SETTINGS.get_string("indicator.active").unwrap_or_default()) {
        handle.toggle_indicator(kind)?;
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => log_event(&event),
                None => break,
            },
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Shutting down");
                break;
            }
        }
    }

    let _ = handle.shutdown();
    if let Err(e) = task.await {
        error!("Session task failed: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_indicators() {
        assert_eq!(active_indicators(""), Vec::new());
        assert_eq!(
            active_indicators("ema, SMA ,ema,bogus"),
            vec![IndicatorKind::Ema, IndicatorKind::Sma]
        );
    }
}
