/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Error Module
//!
//! A single error type for every broker client operation.
//!
//! `BrokerError` is a tagged enum; [`BrokerError::kind`] reports which family
//! an error belongs to, looking through the context and retry wrappers that
//! operations add on the way out. The classification predicates
//! ([`is_not_found`](BrokerError::is_not_found),
//! [`is_conflict`](BrokerError::is_conflict),
//! [`is_timeout`](BrokerError::is_timeout)) do the same, so callers can branch
//! without inspecting raw status codes.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = BrokerError> = std::result::Result<T, E>;

/// Network-level failure messages that are worth another attempt.
const TRANSIENT_MARKERS: [&str; 3] = ["connection refused", "timeout", "temporary failure"];

/// A structured error returned by the broker for a 4xx/5xx response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    /// HTTP status code of the response
    #[serde(skip)]
    pub status: u16,
    /// Broker error code (`error` in the body)
    #[serde(rename = "error", default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    /// Optional finer-grained code (`error_code` in the body)
    #[serde(default)]
    pub error_code: Option<String>,
}

impl ApiError {
    /// Builds the error for a response whose body is not a structured broker
    /// error. The raw body is appended to the description as-is.
    pub fn from_raw(status: u16, status_line: &str, body: &str) -> Self {
        let mut description = format!("HTTP {}: {}", status, status_line);
        if !body.is_empty() {
            description.push_str(" - ");
            description.push_str(body);
        }
        Self {
            status,
            code: "HTTPError".to_string(),
            description,
            error_code: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404 || self.code == "NotFound"
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409 || self.code == "Conflict"
    }

    pub fn is_timeout(&self) -> bool {
        self.status == 408 || self.description.contains("timeout")
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.description)
        }
    }
}

impl std::error::Error for ApiError {}

/// Error families, as reported by [`BrokerError::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection, DNS, TLS, timeout or malformed URL
    Transport,
    /// Structured 4xx/5xx error from the broker
    Api,
    /// A non-error status that the operation did not expect
    UnexpectedStatus,
    /// A JSON body that could not be encoded or decoded
    Decode,
    /// Malformed YAML in a manifest or credentials payload
    Validation,
    /// No catalog entry or instance matched a lookup
    NotFound,
    /// An asynchronous operation failed, reported an unknown state, or ran out of time
    Operation,
    /// The caller cancelled the operation
    Cancelled,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("unexpected status {status}: {status_line}")]
    UnexpectedStatus { status: u16, status_line: String },

    #[error("failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to marshal request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("{context}: invalid YAML: {source}")]
    Validation {
        context: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("unknown operation state: {0}")]
    UnknownOperationState(String),

    #[error("operation timed out after {}s", .0.as_secs())]
    OperationTimeout(Duration),

    #[error("request failed after {attempts} attempts: {source}")]
    Retries {
        attempts: u32,
        #[source]
        source: Box<BrokerError>,
    },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<BrokerError>,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl BrokerError {
    /// Wraps the error with a description of what was being attempted.
    pub fn context(self, context: impl Into<String>) -> Self {
        BrokerError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, past any context or retry wrappers.
    pub fn root(&self) -> &BrokerError {
        match self {
            BrokerError::Context { source, .. } | BrokerError::Retries { source, .. } => {
                source.root()
            }
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            BrokerError::Transport(_) | BrokerError::InvalidUrl { .. } => ErrorKind::Transport,
            BrokerError::Api(_) => ErrorKind::Api,
            BrokerError::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            BrokerError::Decode(_) | BrokerError::Encode(_) => ErrorKind::Decode,
            BrokerError::Validation { .. } => ErrorKind::Validation,
            BrokerError::NotFound(_) => ErrorKind::NotFound,
            BrokerError::OperationFailed(_)
            | BrokerError::UnknownOperationState(_)
            | BrokerError::OperationTimeout(_) => ErrorKind::Operation,
            BrokerError::Cancelled => ErrorKind::Cancelled,
            BrokerError::Retries { .. } | BrokerError::Context { .. } => {
                unreachable!("root() never returns a wrapper")
            }
        }
    }

    /// The broker's structured error, if this is (or wraps) one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self.root() {
            BrokerError::Api(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self.root() {
            BrokerError::Api(e) => e.is_not_found(),
            BrokerError::NotFound(_) => true,
            _ => false,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_conflict)
    }

    /// Timeout detection. Broker errors are judged by status and description;
    /// anything else by its message, since network-level timeouts never reach HTTP.
    pub fn is_timeout(&self) -> bool {
        match self.root() {
            BrokerError::Api(e) => e.is_timeout(),
            BrokerError::Transport(e) if e.is_timeout() => true,
            BrokerError::OperationTimeout(_) => true,
            other => full_message(other).contains("timeout"),
        }
    }

    /// Whether another attempt could succeed: server errors (5xx) and
    /// network faults such as refused connections, timeouts and temporary
    /// resolution failures. Client errors, decode failures and malformed
    /// URLs are permanent.
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            BrokerError::Api(e) => e.status >= 500,
            BrokerError::Cancelled => false,
            BrokerError::Transport(e) if e.is_timeout() => true,
            other => {
                let message = full_message(other).to_lowercase();
                TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
            }
        }
    }
}

/// The error's message followed by every message in its source chain.
fn full_message(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
