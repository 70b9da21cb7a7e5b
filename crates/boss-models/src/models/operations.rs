/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Request and response bodies for the instance lifecycle endpoints
//! (`/v2/service_instances/...`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Organization and space placeholders sent on provision. The broker does not
/// run under a platform with real orgs/spaces, so fixed sentinels are used.
pub const PLACEHOLDER_GUID: &str = "boss";

/// Free-form parameter map passed through to the broker.
pub type Parameters = Map<String, Value>;

/// Body of `PUT /v2/service_instances/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub service_id: String,
    pub plan_id: String,
    pub organization_guid: String,
    pub space_guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Parameters>,
}

impl ProvisionRequest {
    pub fn new(service_id: &str, plan_id: &str, parameters: Option<Parameters>) -> Self {
        Self {
            service_id: service_id.to_string(),
            plan_id: plan_id.to_string(),
            organization_guid: PLACEHOLDER_GUID.to_string(),
            space_guid: PLACEHOLDER_GUID.to_string(),
            parameters: parameters.filter(|p| !p.is_empty()),
            context: None,
        }
    }
}

/// Body of `PATCH /v2/service_instances/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub service_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
}

impl UpdateRequest {
    /// An empty `plan_id` means "keep the current plan" and is omitted.
    pub fn new(service_id: &str, plan_id: &str, parameters: Option<Parameters>) -> Self {
        Self {
            service_id: service_id.to_string(),
            plan_id: Some(plan_id.to_string()).filter(|p| !p.is_empty()),
            parameters: parameters.filter(|p| !p.is_empty()),
        }
    }
}

/// Body returned by provision/update/deprovision. `operation` is only set for
/// asynchronous (202 Accepted) responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AsyncOperation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
}

impl AsyncOperation {
    /// The operation token, if the broker returned a non-empty one.
    pub fn token(&self) -> Option<&str> {
        self.operation.as_deref().filter(|op| !op.is_empty())
    }
}

/// State reported by the last-operation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationState {
    Succeeded,
    Failed,
    InProgress,
    /// Anything the protocol does not define
    Unknown(String),
}

impl From<String> for OperationState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "succeeded" => OperationState::Succeeded,
            "failed" => OperationState::Failed,
            "in progress" => OperationState::InProgress,
            _ => OperationState::Unknown(state),
        }
    }
}

impl Default for OperationState {
    fn default() -> Self {
        OperationState::Unknown(String::new())
    }
}

impl From<OperationState> for String {
    fn from(state: OperationState) -> Self {
        state.to_string()
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationState::Succeeded => write!(f, "succeeded"),
            OperationState::Failed => write!(f, "failed"),
            OperationState::InProgress => write!(f, "in progress"),
            OperationState::Unknown(state) => write!(f, "{}", state),
        }
    }
}

/// Body of `GET /v2/service_instances/{id}/last_operation`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastOperation {
    pub state: OperationState,
    #[serde(default)]
    pub description: String,
}
