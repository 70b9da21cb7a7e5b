/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Time source for retry backoff and operation polling.
//!
//! The client never calls `tokio::time` directly; it goes through a [`Clock`]
//! so tests can substitute a clock that records sleeps and advances instantly.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::{Duration, Instant};

#[async_trait]
pub trait Clock: Debug + Send + Sync {
    /// Current instant, used for deadline checks.
    fn now(&self) -> Instant;

    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
