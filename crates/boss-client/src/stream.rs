/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Line-by-line reading of a task log as the broker writes it.

use crate::client::BrokerClient;
use crate::error::{BrokerError, Result};
use tokio_util::sync::CancellationToken;

/// A lazily read task log.
///
/// Lines are yielded as soon as their terminating newline arrives; a final
/// unterminated line is yielded when the broker closes the stream. The
/// connection stays open until the stream is dropped.
#[derive(Debug)]
pub struct TaskLogStream {
    response: reqwest::Response,
    buffer: Vec<u8>,
    cancel: CancellationToken,
    finished: bool,
}

impl TaskLogStream {
    fn new(response: reqwest::Response, cancel: CancellationToken) -> Self {
        Self {
            response,
            buffer: Vec::new(),
            cancel,
            finished: false,
        }
    }

    /// The next log line without its line terminator, or `None` once the
    /// broker has closed the stream.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=end).collect();
                return Ok(Some(decode_line(&line[..end])));
            }

            if self.finished {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let line = std::mem::take(&mut self.buffer);
                return Ok(Some(decode_line(&line)));
            }

            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(BrokerError::Cancelled),
                chunk = self.response.chunk() => chunk?,
            };

            match chunk {
                Some(bytes) => self.buffer.extend_from_slice(&bytes),
                None => self.finished = true,
            }
        }
    }
}

fn decode_line(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

impl BrokerClient {
    /// Opens the task log of instance `id` for incremental reading.
    ///
    /// With `follow`, the broker keeps the connection open and appends new
    /// output as the task runs. Reads stop with [`BrokerError::Cancelled`]
    /// when the client's cancellation token fires.
    pub async fn stream_task(&self, id: &str, follow: bool) -> Result<TaskLogStream> {
        let mut path = format!("/b/{}/task.log", id);
        if follow {
            path.push_str("?follow=true");
        }

        let response = self
            .open_stream(&path)
            .await
            .map_err(|e| e.context(format!("failed to stream task log for {}", id)))?;
        Ok(TaskLogStream::new(response, self.cancellation().clone()))
    }
}
