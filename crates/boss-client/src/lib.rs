/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Boss Client
//!
//! An HTTP client for Open Service Broker style APIs that provision and manage
//! service instances, plus the `boss` command-line tool built on it.
//!
//! ## Architecture
//!
//! ### Client Module
//! ```rust,ignore
//! pub mod client;
//! ```
//! Configuration and the transport engine:
//! - Basic authentication and API version headers
//! - Retry with quadratic backoff
//! - Response classification into typed errors
//! - Debug and trace request dumps
//!
//! ### Operations
//! Catalog lookup, instance lifecycle, log, manifest and credential retrieval
//! are methods on [`BrokerClient`]. [`BrokerClient::create_and_wait`] polls
//! asynchronous provisioning to completion and
//! [`BrokerClient::stream_task`] follows a task log line by line.
//!
//! ### CLI Module
//! ```rust,ignore
//! pub mod cli;
//! ```
//! Argument parsing and the subcommands of the `boss` binary.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use boss_client::ClientConfig;
//!
//! # async fn run() -> boss_client::Result<()> {
//! let client = ClientConfig::new("https://10.0.0.4:25555", "admin", "secret").open()?;
//! let (service, plan) = client.plan("redis", "small").await?;
//! client.create("redis-1", &service.id, &plan.id, None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! The CLI loads settings through `boss_utils::Settings`:
//!
//! ```toml
//! [broker]
//! url = "https://10.0.0.4:25555"
//! username = "admin"
//! password = "secret"
//! max_retries = 3
//! ```

mod broker;
pub mod cli;
pub mod client;
pub mod clock;
pub mod error;
mod polling;
pub mod retry;
pub mod stream;
pub mod utils;

pub use client::{BrokerClient, ClientConfig};
pub use clock::{Clock, TokioClock};
pub use error::{ApiError, BrokerError, ErrorKind, Result};
pub use stream::TaskLogStream;

pub use boss_models::models::catalog::{Catalog, Plan, Service};
pub use boss_models::models::instances::{BrokerStatus, Instance};
pub use boss_models::models::operations::{LastOperation, OperationState, Parameters};
