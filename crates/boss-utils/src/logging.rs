/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Boss Logging Module
//!
//! A small `log` backend for the boss CLI and client library.
//!
//! Everything is written to stderr so that command output on stdout (task logs,
//! manifests, credentials) stays clean and can be piped.
//!
//! ## Usage
//!
//! 1. Initialize the logger:
//!    ```
//!    boss_utils::logging::init("info").expect("Failed to initialize logger");
//!    ```
//!
//! 2. Use the log macros through the prelude:
//!    ```
//!    use boss_utils::logging::prelude::*;
//!    debug!("This is a debug message");
//!    warn!("This is a warning message");
//!    ```
//!
//! 3. Raise the level at runtime, e.g. when `--debug` or `--trace` is passed:
//!    ```
//!    boss_utils::logging::update_log_level("trace").expect("Failed to update log level");
//!    ```
//!
//! ## Log Levels
//!
//! - "off": Turn off all logging
//! - "error": Log only errors
//! - "warn": Log warnings and errors
//! - "info": Log info, warnings, and errors (default for unknown strings)
//! - "debug": Request/response summaries from the broker client
//! - "trace": Full HTTP request/response dumps

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub use log::{debug, error, info, trace, warn};

static LOGGER: BossLogger = BossLogger;
static CURRENT_LEVEL: AtomicUsize = AtomicUsize::new(LevelFilter::Info as usize);
static JSON_FORMAT: AtomicBool = AtomicBool::new(false);
static INIT: OnceCell<()> = OnceCell::new();

/// Stderr logger for the boss application
pub struct BossLogger;

impl log::Log for BossLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= level_filter_from_usize(CURRENT_LEVEL.load(Ordering::Relaxed))
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if JSON_FORMAT.load(Ordering::Relaxed) {
                let log_entry = serde_json::json!({
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "level": record.level().to_string().to_lowercase(),
                    "target": record.target(),
                    "message": format!("{}", record.args()),
                    "module": record.module_path(),
                });
                eprintln!("{}", log_entry);
            } else {
                eprintln!(
                    "{} - {}: {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    record.level(),
                    record.args()
                );
            }
        }
    }

    fn flush(&self) {}
}

/// Initializes the logging system with the specified log level and text output.
///
/// # Arguments
/// * `level` - String representation of the log level ("debug", "info", "warn", "error")
pub fn init(level: &str) -> Result<(), SetLoggerError> {
    init_with_format(level, "text")
}

/// Initializes the logging system with the specified log level and format.
///
/// Calling this more than once is allowed; later calls only change the level
/// and format.
///
/// # Arguments
/// * `level` - String representation of the log level
/// * `format` - Log output format ("text" for human-readable, "json" for structured JSON)
pub fn init_with_format(level: &str, format: &str) -> Result<(), SetLoggerError> {
    let level_filter = str_to_level_filter(level);
    let use_json = format.eq_ignore_ascii_case("json");

    INIT.get_or_try_init(|| {
        log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Trace))
    })?;

    JSON_FORMAT.store(use_json, Ordering::Relaxed);
    CURRENT_LEVEL.store(level_filter as usize, Ordering::Relaxed);
    log::set_max_level(level_filter);
    Ok(())
}

/// Updates the current log level.
///
/// # Arguments
///
/// * `level` - A string slice that holds the new desired log level.
pub fn update_log_level(level: &str) -> Result<(), String> {
    let new_level = str_to_level_filter(level);
    CURRENT_LEVEL.store(new_level as usize, Ordering::Relaxed);
    log::set_max_level(new_level);
    Ok(())
}

/// Picks the effective level from the configured level and the CLI's
/// `--debug`/`--trace` switches. Trace implies debug; neither switch ever
/// lowers a more verbose configured level.
pub fn effective_level(configured: &str, debug: bool, trace: bool) -> String {
    let configured_filter = str_to_level_filter(configured);
    let requested = if trace {
        LevelFilter::Trace
    } else if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Off
    };

    configured_filter.max(requested).to_string().to_lowercase()
}

fn str_to_level_filter(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn level_filter_from_usize(v: usize) -> LevelFilter {
    match v {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        5 => LevelFilter::Trace,
        _ => LevelFilter::Off,
    }
}

pub mod prelude {
    pub use log::{debug, error, info, trace, warn};
}
