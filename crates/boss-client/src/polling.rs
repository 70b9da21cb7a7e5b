/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Polling of asynchronous broker operations to completion.

use crate::client::BrokerClient;
use crate::error::{BrokerError, Result};
use boss_models::models::instances::Instance;
use boss_models::models::operations::{
    AsyncOperation, LastOperation, OperationState, Parameters,
};
use boss_utils::logging::prelude::*;
use reqwest::StatusCode;
use std::time::Duration;

fn last_operation_path(id: &str, token: Option<&str>) -> String {
    let mut path = format!("/v2/service_instances/{}/last_operation", id);
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        path.push_str("?operation=");
        path.extend(url::form_urlencoded::byte_serialize(token.as_bytes()));
    }
    path
}

impl BrokerClient {
    /// Polls the last operation of instance `id` until it leaves the
    /// `in progress` state.
    ///
    /// The first check happens one poll interval after the call. The deadline
    /// (`timeout`, or the configured operation timeout when `None`) is checked
    /// after each poll, so it can be overrun by up to one interval.
    pub async fn wait_for_operation(
        &self,
        id: &str,
        token: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let timeout = timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(self.config().operation_timeout);
        let deadline = self.now() + timeout;
        let path = last_operation_path(id, token);

        loop {
            self.pause(self.config().poll_interval).await?;

            let status: LastOperation = self
                .get_json(&path)
                .await
                .map_err(|e| e.context("failed to get operation status"))?;

            match status.state {
                OperationState::Succeeded => return Ok(()),
                OperationState::Failed => {
                    return Err(BrokerError::OperationFailed(status.description))
                }
                OperationState::InProgress => {
                    if self.config().debug {
                        debug!("Operation in progress: {}", status.description);
                    }
                }
                OperationState::Unknown(state) => {
                    return Err(BrokerError::UnknownOperationState(state))
                }
            }

            if self.now() > deadline {
                return Err(BrokerError::OperationTimeout(timeout));
            }
        }
    }

    /// Provisions instance `id` and, when the broker accepts the request
    /// asynchronously, waits for the operation to finish.
    pub async fn create_and_wait(
        &self,
        id: &str,
        service_id: &str,
        plan_id: &str,
        params: Option<Parameters>,
        timeout: Option<Duration>,
    ) -> Result<Instance> {
        let received = self
            .provision(id, service_id, plan_id, params)
            .await
            .map_err(|e| e.context(format!("failed to create instance {}", id)))?;

        if received.status == StatusCode::ACCEPTED {
            // An undecodable 202 body carries no token.
            let operation: AsyncOperation = received.json().unwrap_or_default();
            if let Some(token) = operation.token() {
                info!("Instance creation started, operation: {}", token);
                self.wait_for_operation(id, Some(token), timeout)
                    .await
                    .map_err(|e| e.context(format!("instance creation failed for {}", id)))?;
            }
        }

        Ok(Instance::with_id(id))
    }
}
