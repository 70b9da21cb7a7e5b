/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Client Module
//!
//! Configuration, transport and the request/response/retry engine shared by
//! every broker operation.
//!
//! ## Construction
//!
//! A [`ClientConfig`] is a plain value. [`ClientConfig::open`] validates it,
//! strips a trailing slash from the base URL and builds the connection pool,
//! returning a ready [`BrokerClient`]. The client is cheap to clone and can be
//! shared across tasks.
//!
//! ## Request Flow
//!
//! ```mermaid
//! flowchart TD
//!     A[Build request] --> B[Send]
//!     B --> C{Response?}
//!     C -->|transport error| E{Retryable?}
//!     C -->|status| D[Classify]
//!     D -->|2xx / DELETE 410| F[Decode body]
//!     D -->|>= 400| E
//!     E -->|yes, budget left| G[Sleep attempt² s] --> A
//!     E -->|no| H[Return error]
//!     E -->|budget spent| I[Wrap with attempt count]
//! ```
//!
//! Every suspension point (backoff sleep, request send, body read) honours the
//! client's cancellation token.

use crate::clock::{Clock, TokioClock};
use crate::error::{ApiError, BrokerError, Result};
use crate::retry::SquareBackoff;
use backoff::backoff::Backoff;
use boss_utils::logging::prelude::*;
use boss_utils::Settings;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_API_VERSION: &str = "2.16";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub const API_VERSION_HEADER: &str = "X-Broker-API-Version";

/// Paths under this prefix belong to the versioned broker API.
const VERSIONED_PREFIX: &str = "/v2/";
const TRACE_SEPARATOR: &str = "=================================";

/// Connection settings for a broker.
///
/// Zero durations, a zero retry count and an empty API version fall back to
/// the defaults when the client is opened. `trace` implies `debug`.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the broker
    pub url: String,
    pub username: String,
    pub password: String,
    /// Skip TLS certificate verification
    pub insecure_skip_verify: bool,
    /// Log request/response summaries
    pub debug: bool,
    /// Log full request/response dumps
    pub trace: bool,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Value of the `X-Broker-API-Version` header
    pub api_version: String,
    /// Interval between last-operation polls
    pub poll_interval: Duration,
    /// Default deadline for asynchronous operations
    pub operation_timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            insecure_skip_verify: false,
            debug: false,
            trace: false,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            api_version: DEFAULT_API_VERSION.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Builds a client configuration from loaded application settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let broker = &settings.broker;
        Self {
            insecure_skip_verify: broker.skip_ssl_validation,
            timeout: Duration::from_secs(broker.timeout_seconds),
            max_retries: broker.max_retries,
            api_version: broker.api_version.clone(),
            poll_interval: Duration::from_secs(broker.poll_interval_seconds),
            operation_timeout: Duration::from_secs(broker.operation_timeout_seconds),
            ..Self::new(&broker.url, &broker.username, &broker.password)
        }
    }

    /// Opens a client that sleeps on the tokio timer.
    pub fn open(self) -> Result<BrokerClient> {
        self.open_with_clock(Arc::new(TokioClock))
    }

    /// Opens a client with an explicit time source.
    pub fn open_with_clock(self, clock: Arc<dyn Clock>) -> Result<BrokerClient> {
        let mut config = self.normalized();

        let base = config.url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base).map_err(|e| BrokerError::InvalidUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BrokerError::InvalidUrl {
                url: config.url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        // Request paths are appended to the base URL verbatim.
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(BrokerError::InvalidUrl {
                url: config.url.clone(),
                reason: "base URL must not carry a query or fragment".to_string(),
            });
        }
        config.url = base;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()?;

        // Log streams stay open for as long as the broker keeps writing, so
        // only the connect phase is bounded.
        let stream_http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()?;

        if config.insecure_skip_verify {
            warn!("TLS certificate verification is disabled for {}", config.url);
        }

        Ok(BrokerClient {
            config: Arc::new(config),
            http,
            stream_http,
            clock,
            cancel: CancellationToken::new(),
        })
    }

    fn normalized(mut self) -> Self {
        if self.trace {
            self.debug = true;
        }
        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }
        if self.max_retries == 0 {
            self.max_retries = DEFAULT_MAX_RETRIES;
        }
        if self.api_version.is_empty() {
            self.api_version = DEFAULT_API_VERSION.to_string();
        }
        if self.poll_interval.is_zero() {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        if self.operation_timeout.is_zero() {
            self.operation_timeout = DEFAULT_OPERATION_TIMEOUT;
        }
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("debug", &self.debug)
            .field("trace", &self.trace)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("api_version", &self.api_version)
            .field("poll_interval", &self.poll_interval)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

/// An opened connection to a broker.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    config: Arc<ClientConfig>,
    http: reqwest::Client,
    stream_http: reqwest::Client,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

/// A request before it is bound to a transport.
#[derive(Debug, Clone)]
struct Outgoing {
    method: Method,
    path: String,
    body: Option<Vec<u8>>,
    /// Structured call: send JSON content negotiation headers
    json: bool,
}

/// A successfully classified response.
#[derive(Debug)]
pub(crate) struct Received {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl Received {
    /// Decodes the body, treating an empty body as the type's default.
    pub fn json<T: DeserializeOwned + Default>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

pub(crate) fn encode<B: Serialize>(body: &B) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(BrokerError::Encode)
}

impl BrokerClient {
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A handle sharing this client's connection pool whose operations stop
    /// with [`BrokerError::Cancelled`] once `token` is cancelled.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..self.clone()
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.url, path)
    }

    pub(crate) fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Sleeps on the client's clock unless cancelled first.
    pub(crate) async fn pause(&self, duration: Duration) -> Result<()> {
        self.cancellable(self.clock.sleep(duration)).await
    }

    pub(crate) async fn cancellable<F: Future>(&self, future: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BrokerError::Cancelled),
            output = future => Ok(output),
        }
    }

    /// Structured call with JSON headers, retried per the client's budget.
    pub(crate) async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Received> {
        self.send(&Outgoing {
            method,
            path: path.to_string(),
            body,
            json: true,
        })
        .await
    }

    pub(crate) async fn get_json<T: DeserializeOwned + Default>(&self, path: &str) -> Result<T> {
        self.call(Method::GET, path, None).await?.json()
    }

    /// Plain-text GET. Anything but 200 is an error.
    pub(crate) async fn text(&self, path: &str) -> Result<String> {
        let received = self
            .send(&Outgoing {
                method: Method::GET,
                path: path.to_string(),
                body: None,
                json: false,
            })
            .await?;

        if received.status != StatusCode::OK {
            return Err(BrokerError::UnexpectedStatus {
                status: received.status.as_u16(),
                status_line: received.status.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&received.body).into_owned())
    }

    /// Opens a plain-text GET whose body the caller will read incrementally.
    /// A single attempt is made; anything but 200 fails before the body is read.
    pub(crate) async fn open_stream(&self, path: &str) -> Result<reqwest::Response> {
        let outgoing = Outgoing {
            method: Method::GET,
            path: path.to_string(),
            body: None,
            json: false,
        };
        let request = self.build(&self.stream_http, &outgoing)?;
        self.log_request(&request, &outgoing);

        let response = self.cancellable(self.stream_http.execute(request)).await??;
        let status = response.status();
        if self.config.trace {
            trace!(
                "{}\n{}\n",
                TRACE_SEPARATOR,
                dump_head(status, response.headers())
            );
        }
        if self.config.debug {
            debug!("RESPONSE: {}", status.as_u16());
        }

        if status == StatusCode::OK {
            return Ok(response);
        }
        if status.is_client_error() || status.is_server_error() {
            let body = self.cancellable(response.bytes()).await??;
            return Err(api_error(status, &body).into());
        }
        Err(BrokerError::UnexpectedStatus {
            status: status.as_u16(),
            status_line: status.to_string(),
        })
    }

    async fn send(&self, outgoing: &Outgoing) -> Result<Received> {
        let mut backoff = SquareBackoff::new(self.config.max_retries);

        loop {
            let err = match self.attempt(outgoing).await {
                Ok(received) => return Ok(received),
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            match backoff.next_backoff() {
                Some(wait) => {
                    warn!(
                        "Retrying {} {} after {}s (attempt {}/{}): {}",
                        outgoing.method,
                        outgoing.path,
                        wait.as_secs(),
                        backoff.retries() + 1,
                        self.config.max_retries + 1,
                        err
                    );
                    self.pause(wait).await?;
                }
                None => {
                    return Err(BrokerError::Retries {
                        attempts: backoff.retries() + 1,
                        source: Box::new(err),
                    })
                }
            }
        }
    }

    async fn attempt(&self, outgoing: &Outgoing) -> Result<Received> {
        let request = self.build(&self.http, outgoing)?;
        self.log_request(&request, outgoing);

        let response = self.cancellable(self.http.execute(request)).await??;
        let status = response.status();
        let headers = response.headers().clone();
        let body = self.cancellable(response.bytes()).await??.to_vec();

        if self.config.trace {
            trace!(
                "{}\n{}\n{}\n",
                TRACE_SEPARATOR,
                dump_head(status, &headers),
                String::from_utf8_lossy(&body)
            );
        }
        if self.config.debug {
            debug!("RESPONSE: {}", status.as_u16());
            debug!("BODY: {}", String::from_utf8_lossy(&body));
        }

        classify(&outgoing.method, status, body)
    }

    fn build(&self, http: &reqwest::Client, outgoing: &Outgoing) -> Result<Request> {
        let mut builder = http
            .request(outgoing.method.clone(), self.url(&outgoing.path))
            .basic_auth(&self.config.username, Some(&self.config.password));

        if outgoing.path.starts_with(VERSIONED_PREFIX) {
            builder = builder.header(API_VERSION_HEADER, &self.config.api_version);
        }
        if outgoing.json {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "application/json");
        }
        if let Some(body) = &outgoing.body {
            builder = builder.body(body.clone());
        }

        Ok(builder.build()?)
    }

    fn log_request(&self, request: &Request, outgoing: &Outgoing) {
        if self.config.debug {
            debug!("REQUEST: {} {}", request.method(), request.url());
            if let Some(body) = &outgoing.body {
                debug!("BODY: {}", String::from_utf8_lossy(body));
            }
        }
        if self.config.trace {
            trace!("{}\n{}\n", TRACE_SEPARATOR, dump_request(request));
        }
    }
}

/// Maps a response status onto success or a typed error.
fn classify(method: &Method, status: StatusCode, body: Vec<u8>) -> Result<Received> {
    if *method == Method::DELETE && status == StatusCode::GONE {
        return Ok(Received { status, body });
    }
    if status.as_u16() >= 400 {
        return Err(api_error(status, &body).into());
    }
    if !status.is_success() {
        return Err(BrokerError::UnexpectedStatus {
            status: status.as_u16(),
            status_line: status.to_string(),
        });
    }
    Ok(Received { status, body })
}

/// Decodes a structured broker error, or synthesizes one from the raw body.
fn api_error(status: StatusCode, body: &[u8]) -> ApiError {
    match serde_json::from_slice::<ApiError>(body) {
        Ok(mut err) if !err.code.is_empty() => {
            err.status = status.as_u16();
            err
        }
        _ => ApiError::from_raw(
            status.as_u16(),
            &status.to_string(),
            &String::from_utf8_lossy(body),
        ),
    }
}

fn dump_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn dump_request(request: &Request) -> String {
    let body = request
        .body()
        .and_then(|b| b.as_bytes())
        .map(String::from_utf8_lossy)
        .unwrap_or_default();
    format!(
        "{} {} HTTP/1.1\n{}\n\n{}",
        request.method(),
        request.url(),
        dump_headers(request.headers()),
        body
    )
}

fn dump_head(status: StatusCode, headers: &HeaderMap) -> String {
    format!("HTTP/1.1 {}\n{}\n", status, dump_headers(headers))
}
