/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Boss Config Module
//! This module provides the configuration framework shared by the boss crates.
//!
//! # Variable Naming Convention
//!
//! - Struct fields use snake_case (e.g., `broker`, `max_retries`)
//! - Environment variables use SCREAMING_SNAKE_CASE and are prefixed with "BOSS__" (e.g., `BOSS__BROKER__URL`)
//! - Configuration file keys use snake_case (e.g., `broker.url`, `log.level`)
//!
//! # Configuration Overriding
//!
//! The configuration values are loaded and overridden in the following order (later sources take precedence):
//!
//! 1. Default values from the embedded `default.toml` file
//! 2. Values from an optional external configuration file (if provided)
//! 3. Environment variables
//!
//! Command line flags are applied on top of the loaded settings by the CLI.
//!
//! # Available Environment Variables
//!
//! - `BOSS__BROKER__URL`: Base URL of the service broker
//!   Default: "http://localhost:3000"
//!
//! - `BOSS__BROKER__USERNAME` / `BOSS__BROKER__PASSWORD`: HTTP Basic credentials
//!
//! - `BOSS__BROKER__SKIP_SSL_VALIDATION`: Skip TLS certificate verification
//!   Default: false
//!
//! - `BOSS__BROKER__TIMEOUT_SECONDS`: Per-request timeout
//!   Default: 30
//!
//! - `BOSS__BROKER__MAX_RETRIES`: Retries after the first attempt
//!   Default: 3
//!
//! - `BOSS__BROKER__API_VERSION`: Value of the `X-Broker-API-Version` header
//!   Default: "2.16"
//!
//! - `BOSS__BROKER__POLL_INTERVAL_SECONDS`: Interval between last-operation polls
//!   Default: 5
//!
//! - `BOSS__BROKER__OPERATION_TIMEOUT_SECONDS`: Deadline for asynchronous operations
//!   Default: 1800
//!
//! - `BOSS__LOG__LEVEL`: Sets the log level for the application
//!   Default: "warn"
//!   Possible values: "trace", "debug", "info", "warn", "error", "off"
//!
//! - `BOSS__LOG__FORMAT`: "text" or "json"
//!   Default: "text"

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

// Include the default settings file as a string constant
const DEFAULT_SETTINGS: &str = include_str!("../default.toml");

/// Represents the main settings structure for the application
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Broker connection configuration
    pub broker: Broker,
    /// Logging configuration
    pub log: Log,
}

/// Represents the broker connection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Broker {
    /// Base URL of the broker
    pub url: String,
    /// Basic auth username
    pub username: String,
    /// Basic auth password
    pub password: String,
    /// Skip TLS certificate verification.
    /// Only for development brokers or self-signed certificates.
    #[serde(default)]
    pub skip_ssl_validation: bool,
    /// Request timeout in seconds (0 means the default of 30)
    pub timeout_seconds: u64,
    /// Max number of retries after the first attempt (0 means the default of 3)
    pub max_retries: u32,
    /// Broker API version sent on versioned endpoints
    pub api_version: String,
    /// Interval between last-operation polls in seconds
    pub poll_interval_seconds: u64,
    /// Deadline for asynchronous operations in seconds
    pub operation_timeout_seconds: u64,
}

/// Represents the logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Log {
    /// Log level (e.g., "info", "debug", "warn", "error")
    pub level: String,
    /// Log format: "text" for human-readable, "json" for structured JSON
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Settings {
    /// Creates a new `Settings` instance
    ///
    /// # Arguments
    ///
    /// * `file` - An optional path to a configuration file
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the `Settings` instance or a `ConfigError`
    pub fn new(file: Option<String>) -> Result<Self, ConfigError> {
        let mut s = Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS, config::FileFormat::Toml));

        s = match file {
            Some(x) => s.add_source(File::with_name(x.as_str())),
            None => s,
        };

        s = s.add_source(Environment::with_prefix("BOSS").separator("__"));

        s.build()?.try_deserialize()
    }
}
