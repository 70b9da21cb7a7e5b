/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Retry schedule for broker requests.
//!
//! The wait before retry `n` is `n²` seconds (1s, 4s, 9s, ...), not the
//! usual `base * 2^n` curve.

use backoff::backoff::Backoff;
use std::time::Duration;

/// Quadratic backoff bounded by a retry budget.
///
/// Yields exactly `max_retries` waits, then `None`.
#[derive(Debug, Clone)]
pub struct SquareBackoff {
    attempt: u32,
    max_retries: u32,
}

impl SquareBackoff {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempt: 0,
            max_retries,
        }
    }

    /// Retries handed out so far.
    pub fn retries(&self) -> u32 {
        self.attempt
    }
}

impl Backoff for SquareBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_retries {
            return None;
        }
        self.attempt += 1;
        Some(Duration::from_secs(u64::from(self.attempt).pow(2)))
    }
}
