//! Trader module - session core and its collaborators.
//!
//! - **constant**: Kline intervals
//! - **object**: Bar and Instrument data structures
//! - **gateway**: Live feed connection traits and event sender
//! - **datafeed**: Backfill provider trait
//! - **reconciler**: Raw feed message to bar series merge
//! - **engine**: Session controller, actor loop and handle
//! - **setting**: Global settings management
//! - **logger**: Logging setup
//! - **utility**: Paths and small helpers

pub mod constant;
pub mod datafeed;
pub mod engine;
pub mod gateway;
pub mod logger;
pub mod object;
pub mod reconciler;
pub mod setting;
pub mod utility;

// Re-exports for convenience
pub use constant::Interval;
pub use datafeed::{BackfillProvider, EmptyDatafeed, DEFAULT_BACKFILL_LIMIT};
pub use engine::{SessionCommand, SessionConfig, SessionController, SessionHandle, SessionState};
pub use gateway::{ConnectionStatus, FeedConnection, FeedConnector, FeedEnvelope, FeedEvent, FeedEventSender};
pub use logger::{init_logger, CRITICAL, DEBUG, ERROR, INFO, WARNING};
pub use object::{ApplyOutcome, Bar, Instrument};
pub use reconciler::{ReconcileStats, Reconciled, StreamReconciler};
pub use setting::{SettingValue, Settings, SETTINGS};
pub use utility::{get_file_path, get_folder_path, ms_to_seconds, TEMP_DIR};
