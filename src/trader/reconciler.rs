//! Turns raw kline messages into bar updates.
//!
//! A message is parsed into a candidate bar, merged into the `BarStore`, and
//! the active indicators are refreshed for the newest point. Malformed,
//! irrelevant and stale messages are dropped and counted, never fatal.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::chart::{BarStore, IndicatorSet, IndicatorUpdate};
use crate::error::{BarError, BarResult};

use super::object::{ApplyOutcome, Bar, Instrument};
use super::utility::ms_to_seconds;

/// Counters kept by the reconciler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub received: u64,
    pub appended: u64,
    pub amended: u64,
    pub stale: u64,
    pub malformed: u64,
    pub ignored: u64,
}

/// A bar merged into the series, with the indicator updates it caused
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub bar: Bar,
    pub outcome: ApplyOutcome,
    pub indicators: Vec<IndicatorUpdate>,
}

/// Read a numeric field sent either as a JSON string or a JSON number
fn number_field(k: &Value, key: &str) -> BarResult<f64> {
    let value = match k.get(key) {
        Some(Value::String(s)) => s.parse::<f64>().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };
    value.ok_or_else(|| BarError::MalformedMessage(format!("field '{}' missing or not numeric", key)))
}

/// Reconciles the live feed with the bar series
#[derive(Debug, Default)]
pub struct StreamReconciler {
    instrument: Option<Instrument>,
    stats: ReconcileStats,
}

impl StreamReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept messages for this instrument
    pub fn for_instrument(instrument: Instrument) -> Self {
        Self {
            instrument: Some(instrument),
            stats: ReconcileStats::default(),
        }
    }

    /// Rebind to a new instrument and reset the counters
    pub fn set_instrument(&mut self, instrument: Option<Instrument>) {
        self.instrument = instrument;
        self.stats = ReconcileStats::default();
    }

    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }

    /// Parse a raw message into a candidate bar.
    ///
    /// `Ok(None)` means the message is valid JSON but not a kline for the
    /// subscribed instrument.
    pub fn parse(&self, raw: &str) -> BarResult<Option<Bar>> {
        let msg: Value = serde_json::from_str(raw)
            .map_err(|e| BarError::MalformedMessage(format!("invalid JSON: {}", e)))?;

        // Combined streams wrap the payload in {"stream": .., "data": ..}
        let payload = msg.get("data").unwrap_or(&msg);
        let Some(k) = payload.get("k") else {
            return Ok(None);
        };
        if !k.is_object() {
            return Err(BarError::MalformedMessage("kline payload is not an object".to_string()));
        }

        if let Some(instrument) = &self.instrument {
            if let Some(symbol) = k.get("s").and_then(Value::as_str) {
                if !symbol.eq_ignore_ascii_case(&instrument.symbol) {
                    return Ok(None);
                }
            }
            if let Some(interval) = k.get("i").and_then(Value::as_str) {
                if interval != instrument.interval.value() {
                    return Ok(None);
                }
            }
        }

        let start_ms = k
            .get("t")
            .and_then(Value::as_i64)
            .ok_or_else(|| BarError::MalformedMessage("field 't' missing or not an integer".to_string()))?;

        let bar = Bar {
            time: ms_to_seconds(start_ms),
            open: number_field(k, "o")?,
            high: number_field(k, "h")?,
            low: number_field(k, "l")?,
            close: number_field(k, "c")?,
            volume: number_field(k, "v")?,
            is_final: k.get("x").and_then(Value::as_bool).unwrap_or(false),
        };
        if !bar.is_valid() {
            return Err(BarError::MalformedMessage(format!(
                "bar at t={} has negative or non-finite fields",
                bar.time
            )));
        }
        Ok(Some(bar))
    }

    /// Handle one raw feed message.
    ///
    /// Returns the merged bar and indicator updates, or `None` when the
    /// message was dropped.
    pub fn on_message(
        &mut self,
        raw: &str,
        store: &mut BarStore,
        indicators: &mut IndicatorSet,
    ) -> Option<Reconciled> {
        self.stats.received += 1;

        let bar = match self.parse(raw) {
            Ok(Some(bar)) => bar,
            Ok(None) => {
                self.stats.ignored += 1;
                trace!("Ignoring non-kline message");
                return None;
            }
            Err(e) => {
                self.stats.malformed += 1;
                debug!("Dropping feed message: {}", e);
                return None;
            }
        };

        self.apply(bar, store, indicators)
    }

    /// Merge an already parsed bar.
    pub fn apply(
        &mut self,
        bar: Bar,
        store: &mut BarStore,
        indicators: &mut IndicatorSet,
    ) -> Option<Reconciled> {
        let outcome = match store.apply_update(bar) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.stats.stale += 1;
                debug!("Dropping feed update: {}", e);
                return None;
            }
        };

        match outcome {
            ApplyOutcome::Appended => self.stats.appended += 1,
            ApplyOutcome::Amended => self.stats.amended += 1,
        }

        let indicators = if indicators.any_active() {
            indicators.recompute_incremental(store.closes())
        } else {
            Vec::new()
        };

        Some(Reconciled {
            bar,
            outcome,
            indicators,
        })
    }
}
