//! Logging setup for the kline session.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::setting::SETTINGS;
use super::utility::get_folder_path;

/// Log level constants (compatible with Python logging module)
pub const DEBUG: i32 = 10;
pub const INFO: i32 = 20;
pub const WARNING: i32 = 30;
pub const ERROR: i32 = 40;
pub const CRITICAL: i32 = 50;

/// Convert integer log level to tracing Level
pub fn level_from_int(level: i32) -> Level {
    match level {
        i32::MIN..=10 => Level::DEBUG,
        11..=20 => Level::INFO,
        21..=30 => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Initialize the global subscriber from the `log.*` settings.
///
/// Safe to call more than once; later calls are no-ops. A log file that
/// cannot be opened only disables the file layer.
pub fn init_logger() {
    if !SETTINGS.get_bool("log.active").unwrap_or(true) {
        return;
    }

    let log_level = SETTINGS.get_int("log.level").unwrap_or(INFO as i64) as i32;
    let log_console = SETTINGS.get_bool("log.console").unwrap_or(true);
    let log_file = SETTINGS.get_bool("log.file").unwrap_or(false);
    let log_json = SETTINGS.get_bool("log.json").unwrap_or(false);

    let filter = EnvFilter::from_default_env().add_directive(level_from_int(log_level).into());

    let console_layer = log_console.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(true)
    });

    let file = if log_file {
        match open_log_file() {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Failed to open log file, file logging disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    // JSON lines for the file when `log.json` is set
    let (text_file_layer, json_file_layer) = match file {
        Some(file) if log_json => (None, Some(fmt::layer().json().with_writer(Mutex::new(file)))),
        Some(file) => (Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false)), None),
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(text_file_layer)
        .with(json_file_layer)
        .try_init();
}

fn open_log_file() -> std::io::Result<File> {
    let log_path = get_log_file_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(&log_path)
}

/// Get the log file path for today
fn get_log_file_path() -> PathBuf {
    let log_folder = get_folder_path("log");
    let today = Local::now().format("%Y%m%d").to_string();
    log_folder.join(format!("kline_{}.log", today))
}
