//! Chart items published to the downstream renderer.
//!
//! The session never draws anything itself. It converts bars and indicator
//! updates into time-keyed items and sends them as `ChartEvent`s.

use serde::{Deserialize, Serialize};

use super::indicator::{IndicatorKind, IndicatorUpdate, LineUpdate};
use crate::error::BarError;
use crate::trader::engine::SessionState;
use crate::trader::gateway::ConnectionStatus;
use crate::trader::object::{ApplyOutcome, Bar, Instrument};

/// Candlestick point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleItem {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// close >= open
    pub is_up: bool,
}

impl From<&Bar> for CandleItem {
    fn from(bar: &Bar) -> Self {
        Self {
            time: bar.time,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            is_up: bar.is_up(),
        }
    }
}

/// Volume histogram point, colored like its candle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeItem {
    pub time: i64,
    pub value: f64,
    pub is_up: bool,
}

impl From<&Bar> for VolumeItem {
    fn from(bar: &Bar) -> Self {
        Self {
            time: bar.time,
            value: bar.volume,
            is_up: bar.is_up(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub time: i64,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LineDelta {
    Full(Vec<LinePoint>),
    Last(LinePoint),
    Cleared,
}

/// Indicator line change keyed by bar time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub kind: IndicatorKind,
    pub window: usize,
    pub delta: LineDelta,
}

impl LineItem {
    /// Attach bar times to an index-based indicator update.
    ///
    /// Returns `None` if the update points past the end of `bars`.
    pub fn from_update(update: &IndicatorUpdate, bars: &[Bar]) -> Option<Self> {
        let delta = match &update.update {
            LineUpdate::Full(line) => LineDelta::Full(
                bars.iter()
                    .zip(line)
                    .map(|(bar, value)| LinePoint { time: bar.time, value: *value })
                    .collect(),
            ),
            LineUpdate::Last { index, value } => LineDelta::Last(LinePoint {
                time: bars.get(*index)?.time,
                value: *value,
            }),
            LineUpdate::Cleared => LineDelta::Cleared,
        };
        Some(Self {
            kind: update.kind,
            window: update.window,
            delta,
        })
    }
}

/// Everything the renderer needs to follow a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChartEvent {
    State(SessionState),
    /// Full series after a backfill
    History {
        instrument: Instrument,
        candles: Vec<CandleItem>,
        volumes: Vec<VolumeItem>,
    },
    /// One streamed bar merged into the series
    Bar {
        candle: CandleItem,
        volume: VolumeItem,
        outcome: ApplyOutcome,
    },
    Indicator(LineItem),
    Connection(ConnectionStatus),
    /// A load attempt ended without going live
    LoadFailed(BarError),
}

impl ChartEvent {
    pub fn history(instrument: &Instrument, bars: &[Bar]) -> Self {
        ChartEvent::History {
            instrument: instrument.clone(),
            candles: bars.iter().map(CandleItem::from).collect(),
            volumes: bars.iter().map(VolumeItem::from).collect(),
        }
    }

    pub fn bar(bar: &Bar, outcome: ApplyOutcome) -> Self {
        ChartEvent::Bar {
            candle: CandleItem::from(bar),
            volume: VolumeItem::from(bar),
            outcome,
        }
    }
}
