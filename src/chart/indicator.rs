//! Moving average indicators over the close series.
//!
//! `sma` and `ema` are pure calculators. `IndicatorSet` owns the toggleable
//! subscriptions and keeps their lines in sync with the bar series, either by
//! a full recompute or by refreshing only the newest point.

use serde::{Deserialize, Serialize};
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage};
use ta::Next;
use tracing::debug;

/// Window length used when a subscription is first created
pub const DEFAULT_WINDOW: usize = 20;

/// One optional value per bar index
pub type IndicatorLine = Vec<Option<f64>>;

/// Running moving average state, advanced one close at a time
#[derive(Debug, Clone)]
enum MovingAverage {
    Sma(SimpleMovingAverage),
    Ema(ExponentialMovingAverage),
}

impl MovingAverage {
    fn next(&mut self, close: f64) -> f64 {
        match self {
            MovingAverage::Sma(indicator) => indicator.next(close),
            MovingAverage::Ema(indicator) => indicator.next(close),
        }
    }
}

/// Simple moving average. Indices before `length - 1` have no value.
pub fn sma(closes: &[f64], length: usize) -> IndicatorLine {
    IndicatorKind::Sma.calculate(closes, length)
}

/// Exponential moving average seeded with the first close, so every index
/// has a value.
pub fn ema(closes: &[f64], length: usize) -> IndicatorLine {
    IndicatorKind::Ema.calculate(closes, length)
}

/// Indicator kinds available for subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    Sma,
    Ema,
}

impl IndicatorKind {
    /// Fresh calculator, `None` for a zero window
    fn calculator(&self, length: usize) -> Option<MovingAverage> {
        match self {
            IndicatorKind::Sma => SimpleMovingAverage::new(length).ok().map(MovingAverage::Sma),
            IndicatorKind::Ema => ExponentialMovingAverage::new(length).ok().map(MovingAverage::Ema),
        }
    }

    /// Value shown at index `i`; the SMA warm-up region has none
    fn value(&self, raw: f64, i: usize, length: usize) -> Option<f64> {
        match self {
            IndicatorKind::Sma => (i + 1 >= length).then_some(raw),
            IndicatorKind::Ema => Some(raw),
        }
    }

    /// Run the full calculator for this kind
    pub fn calculate(&self, closes: &[f64], length: usize) -> IndicatorLine {
        let Some(mut indicator) = self.calculator(length) else {
            return vec![None; closes.len()];
        };
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| self.value(indicator.next(*close), i, length))
            .collect()
    }
}

impl std::str::FromStr for IndicatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sma" | "ma" => Ok(IndicatorKind::Sma),
            "ema" => Ok(IndicatorKind::Ema),
            other => Err(format!("Unknown indicator: {}", other)),
        }
    }
}

/// Change to one indicator line produced by a recompute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LineUpdate {
    /// Whole line, one value per bar
    Full(IndicatorLine),
    /// Only the value at `index` changed
    Last { index: usize, value: Option<f64> },
    /// Line must be removed from display
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorUpdate {
    pub kind: IndicatorKind,
    pub window: usize,
    pub update: LineUpdate,
}

/// A toggleable indicator and its current line.
#[derive(Debug, Clone)]
pub struct IndicatorSubscription {
    kind: IndicatorKind,
    window: usize,
    active: bool,
    line: IndicatorLine,
    pending_clear: bool,
    /// Number of leading closes folded into `cursor`
    frozen: usize,
    /// Calculator state after `frozen` closes
    cursor: Option<MovingAverage>,
}

impl IndicatorSubscription {
    fn new(kind: IndicatorKind, window: usize) -> Self {
        Self {
            kind,
            window,
            active: false,
            line: Vec::new(),
            pending_clear: false,
            frozen: 0,
            cursor: None,
        }
    }

    pub fn kind(&self) -> IndicatorKind {
        self.kind
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn line(&self) -> &[Option<f64>] {
        &self.line
    }

    /// Display name, e.g. "SMA20"
    pub fn name(&self) -> String {
        match self.kind {
            IndicatorKind::Sma => format!("SMA{}", self.window),
            IndicatorKind::Ema => format!("EMA{}", self.window),
        }
    }

    fn update(&self, update: LineUpdate) -> IndicatorUpdate {
        IndicatorUpdate {
            kind: self.kind,
            window: self.window,
            update,
        }
    }

    /// Recompute the whole line and remember the state before the last index.
    fn recompute_full(&mut self, closes: &[f64]) {
        self.line = self.kind.calculate(closes, self.window);
        self.frozen = 0;
        self.cursor = self.kind.calculator(self.window);
        let Some(cursor) = self.cursor.as_mut() else {
            return;
        };
        let frozen = closes.len().saturating_sub(1);
        for close in &closes[..frozen] {
            cursor.next(*close);
        }
        self.frozen = frozen;
    }

    /// Refresh only the newest point after an append or amend of the last bar.
    ///
    /// Returns `None` when the series moved by more than one bar and a full
    /// recompute is needed.
    fn recompute_last(&mut self, closes: &[f64]) -> Option<(usize, Option<f64>)> {
        let n = closes.len();
        if n == 0 {
            return None;
        }
        let last = n - 1;
        let grew = match self.line.len() {
            len if len == n => false,
            len if len + 1 == n => true,
            _ => return None,
        };
        if self.frozen > last || (grew && self.frozen + 1 != last) || (!grew && self.frozen != last) {
            return None;
        }

        let cursor = self.cursor.as_mut()?;

        // The previous last bar is frozen once a newer one arrives
        while self.frozen < last {
            cursor.next(closes[self.frozen]);
            self.frozen += 1;
        }

        let raw = cursor.clone().next(closes[last]);
        let value = self.kind.value(raw, last, self.window);
        if grew {
            self.line.push(value);
        } else {
            self.line[last] = value;
        }
        Some((last, value))
    }

    fn take_clear(&mut self) -> Option<IndicatorUpdate> {
        if self.active || !self.pending_clear {
            return None;
        }
        self.pending_clear = false;
        self.line.clear();
        self.frozen = 0;
        self.cursor = None;
        Some(self.update(LineUpdate::Cleared))
    }
}

/// Owns the indicator subscriptions of a session
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    subscriptions: Vec<IndicatorSubscription>,
    default_window: usize,
}

impl Default for IndicatorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::with_default_window(DEFAULT_WINDOW)
    }

    /// Use a different window for subscriptions created from now on
    pub fn with_default_window(window: usize) -> Self {
        Self {
            subscriptions: Vec::new(),
            default_window: window.max(1),
        }
    }

    /// Flip a subscription on or off, creating it on first activation.
    ///
    /// Returns the new active flag. Turning off keeps the line until the next
    /// recompute publishes `Cleared`.
    pub fn toggle(&mut self, kind: IndicatorKind) -> bool {
        let window = self.default_window;
        let sub = match self.subscriptions.iter().position(|s| s.kind == kind) {
            Some(ix) => &mut self.subscriptions[ix],
            None => {
                self.subscriptions.push(IndicatorSubscription::new(kind, window));
                let ix = self.subscriptions.len() - 1;
                &mut self.subscriptions[ix]
            }
        };

        sub.active = !sub.active;
        sub.pending_clear = !sub.active;
        debug!("Indicator {} active={}", sub.name(), sub.active);
        sub.active
    }

    /// Deactivate every subscription
    pub fn clear_all(&mut self) {
        for sub in self.subscriptions.iter_mut().filter(|s| s.active) {
            sub.active = false;
            sub.pending_clear = true;
        }
    }

    pub fn any_active(&self) -> bool {
        self.subscriptions.iter().any(|s| s.active)
    }

    pub fn is_active(&self, kind: IndicatorKind) -> bool {
        self.subscription(kind).is_some_and(|s| s.active)
    }

    pub fn subscription(&self, kind: IndicatorKind) -> Option<&IndicatorSubscription> {
        self.subscriptions.iter().find(|s| s.kind == kind)
    }

    pub fn subscriptions(&self) -> &[IndicatorSubscription] {
        &self.subscriptions
    }

    /// Current line of a subscription, empty when inactive or cleared
    pub fn line(&self, kind: IndicatorKind) -> &[Option<f64>] {
        self.subscription(kind).map(|s| s.line()).unwrap_or(&[])
    }

    /// Recompute every active line over the whole close series.
    pub fn recompute_all(&mut self, closes: &[f64]) -> Vec<IndicatorUpdate> {
        let mut updates = Vec::new();
        for sub in self.subscriptions.iter_mut() {
            if sub.active {
                sub.recompute_full(closes);
                updates.push(sub.update(LineUpdate::Full(sub.line.clone())));
            } else if let Some(update) = sub.take_clear() {
                updates.push(update);
            }
        }
        updates
    }

    /// Refresh active lines after the last bar was appended or amended.
    ///
    /// Produces the same values as `recompute_all` on the same series.
    pub fn recompute_incremental(&mut self, closes: &[f64]) -> Vec<IndicatorUpdate> {
        let mut updates = Vec::new();
        for sub in self.subscriptions.iter_mut() {
            if !sub.active {
                if let Some(update) = sub.take_clear() {
                    updates.push(update);
                }
                continue;
            }

            match sub.recompute_last(closes) {
                Some((index, value)) => {
                    updates.push(sub.update(LineUpdate::Last { index, value }));
                }
                None => {
                    sub.recompute_full(closes);
                    updates.push(sub.update(LineUpdate::Full(sub.line.clone())));
                }
            }
        }
        updates
    }
}
