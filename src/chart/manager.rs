//! Bar series store for the active instrument.
//!
//! Keeps bars ordered by bucket time and merges streamed updates into the
//! series. Only the last bar may change after it is stored; any update that
//! would reorder history is rejected.

use tracing::debug;

use crate::error::{BarError, BarResult};
use crate::trader::object::{ApplyOutcome, Bar};

/// Ordered bar series with a parallel close array for indicator input
#[derive(Debug, Default, Clone)]
pub struct BarStore {
    /// Bars, strictly increasing by time
    bars: Vec<Bar>,
    /// `bars[i].close`, kept in step with `bars`
    closes: Vec<f64>,
}

impl BarStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole series with a backfill.
    ///
    /// The input must be strictly increasing by time and every bar must pass
    /// `Bar::is_valid`. On error the current series is left as it was.
    pub fn replace_all(&mut self, bars: Vec<Bar>) -> BarResult<()> {
        if let Some((index, bar)) = bars.iter().enumerate().find(|(_, bar)| !bar.is_valid()) {
            return Err(BarError::MalformedBackfill { index, time: bar.time });
        }
        if let Some((index, pair)) = bars
            .windows(2)
            .enumerate()
            .find(|(_, pair)| pair[1].time <= pair[0].time)
        {
            return Err(BarError::InvalidBackfill {
                index: index + 1,
                time: pair[1].time,
                previous: pair[0].time,
            });
        }

        self.closes = bars.iter().map(|bar| bar.close).collect();
        self.bars = bars;
        debug!("Bar series replaced: {} bars", self.bars.len());
        Ok(())
    }

    /// Merge one streamed bar into the series.
    pub fn apply_update(&mut self, bar: Bar) -> BarResult<ApplyOutcome> {
        let Some(last) = self.bars.last_mut() else {
            self.push(bar);
            return Ok(ApplyOutcome::Appended);
        };

        if bar.time > last.time {
            self.push(bar);
            Ok(ApplyOutcome::Appended)
        } else if bar.time == last.time {
            *last = bar;
            if let Some(close) = self.closes.last_mut() {
                *close = bar.close;
            }
            Ok(ApplyOutcome::Amended)
        } else {
            Err(BarError::StaleUpdate {
                time: bar.time,
                last: last.time,
            })
        }
    }

    fn push(&mut self, bar: Bar) {
        self.bars.push(bar);
        self.closes.push(bar.close);
    }

    /// Get all bars in time order
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Close prices, one per bar
    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    /// Volumes, one per bar
    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.volume).collect()
    }

    /// Get the last (possibly still open) bar
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Get bar at an index
    pub fn get(&self, ix: usize) -> Option<&Bar> {
        self.bars.get(ix)
    }

    /// Get total number of bars
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Owned copy of the series for consumers outside the session task
    pub fn snapshot(&self) -> Vec<Bar> {
        self.bars.clone()
    }

    /// Clear all data
    pub fn clear(&mut self) {
        self.bars.clear();
        self.closes.clear();
    }
}
