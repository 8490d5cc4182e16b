//! Error types for the bar series core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or updating the bar series.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum BarError {
    /// Backfill payload is not strictly time-increasing.
    #[error("invalid backfill: bar {index} at t={time} does not follow t={previous}")]
    InvalidBackfill { index: usize, time: i64, previous: i64 },

    /// Backfill bar with a non-finite or negative price or volume.
    #[error("invalid backfill: bar {index} at t={time} has a non-finite or negative field")]
    MalformedBackfill { index: usize, time: i64 },

    /// Update refers to a bucket older than the current last bar.
    #[error("stale update: t={time} is older than last bar t={last}")]
    StaleUpdate { time: i64, last: i64 },

    /// The backfill provider returned an error.
    #[error("backfill failed: {0}")]
    BackfillFailed(String),

    /// The live feed could not be opened.
    #[error("feed failed: {0}")]
    FeedFailed(String),

    /// A feed message did not carry a usable kline payload.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

impl BarError {
    /// Errors that are dropped locally instead of failing the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BarError::StaleUpdate { .. } | BarError::MalformedMessage(_))
    }
}

pub type BarResult<T> = Result<T, BarError>;
