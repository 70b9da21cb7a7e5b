/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Broker Operations
//!
//! Typed operations against the broker API, implemented on [`BrokerClient`].
//!
//! | Operation | Endpoint |
//! |---|---|
//! | [`catalog`](BrokerClient::catalog), [`plan`](BrokerClient::plan) | `GET /v2/catalog` |
//! | [`status`](BrokerClient::status), [`log`](BrokerClient::log), [`resolve`](BrokerClient::resolve) | `GET /b/status` |
//! | [`instances`](BrokerClient::instances) | both of the above |
//! | [`create`](BrokerClient::create) | `PUT /v2/service_instances/{id}` |
//! | [`update`](BrokerClient::update) | `PATCH /v2/service_instances/{id}` |
//! | [`delete`](BrokerClient::delete) | `DELETE /v2/service_instances/{id}` |
//! | [`task`](BrokerClient::task) | `GET /b/{id}/task.log` |
//! | [`manifest`](BrokerClient::manifest) | `GET /b/{id}/manifest.yml` |
//! | [`creds`](BrokerClient::creds), [`creds_map`](BrokerClient::creds_map) | `GET /b/{id}/creds.yml` |
//! | [`redeploy`](BrokerClient::redeploy) | `GET /b/{id}/redeploy` |
//!
//! Lifecycle calls pass `accepts_incomplete=true`, so the broker may answer
//! with 202 and an operation token. See [`BrokerClient::create_and_wait`] for
//! the polling variant.

use crate::client::{encode, BrokerClient, Received};
use crate::error::{BrokerError, Result};
use crate::utils::validate_yaml;
use boss_models::models::catalog::{Catalog, Plan, Service};
use boss_models::models::instances::{BrokerStatus, Instance};
use boss_models::models::operations::{Parameters, ProvisionRequest, UpdateRequest};
use boss_utils::logging::prelude::*;
use reqwest::Method;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

pub(crate) const CATALOG_PATH: &str = "/v2/catalog";
pub(crate) const STATUS_PATH: &str = "/b/status";

/// Fields a usable credentials document is expected to carry.
const EXPECTED_CREDENTIALS: [&str; 4] = ["hostname", "port", "username", "password"];

/// The registry keys of `GET /b/status`, ignoring every entry's contents.
#[derive(Debug, Default, Deserialize)]
struct RegistryKeys {
    #[serde(default)]
    instances: Option<HashMap<String, IgnoredAny>>,
}

/// The log field of `GET /b/status`.
#[derive(Debug, Default, Deserialize)]
struct BrokerLog {
    #[serde(default)]
    log: Option<String>,
}

pub(crate) fn instance_path(id: &str) -> String {
    format!("/v2/service_instances/{}?accepts_incomplete=true", id)
}

impl BrokerClient {
    /// Fetches the broker's service catalog.
    pub async fn catalog(&self) -> Result<Catalog> {
        self.get_json(CATALOG_PATH)
            .await
            .map_err(|e| e.context("failed to get catalog"))
    }

    /// Resolves a service and plan, each given by identifier or name.
    pub async fn plan(&self, service: &str, plan: &str) -> Result<(Service, Plan)> {
        let catalog = self.catalog().await?;
        let (service, plan) = catalog
            .plan(service, plan)
            .map_err(|e| BrokerError::NotFound(e.to_string()))?;
        Ok((service.clone(), plan.clone()))
    }

    /// Fetches the broker's instance registry and log.
    pub async fn status(&self) -> Result<BrokerStatus> {
        self.get_json(STATUS_PATH)
            .await
            .map_err(|e| e.context("failed to get status"))
    }

    /// The broker's own log, as reported by the status endpoint.
    pub async fn log(&self) -> Result<String> {
        let status: BrokerLog = self
            .get_json(STATUS_PATH)
            .await
            .map_err(|e| e.context("failed to get log"))?;
        Ok(status.log.unwrap_or_default())
    }

    /// Expands a full or partial instance identifier.
    ///
    /// An exact match wins; otherwise the first identifier (in sorted order)
    /// starting with `want` is returned. Only the registry keys are read.
    pub async fn resolve(&self, want: &str) -> Result<String> {
        let registry: RegistryKeys = self
            .get_json(STATUS_PATH)
            .await
            .map_err(|e| e.context("failed to get status"))?;
        let instances = registry.instances.unwrap_or_default();
        resolve_id(instances.keys(), want)
            .ok_or_else(|| BrokerError::NotFound(format!("no instance found matching '{}'", want)))
    }

    /// Lists every instance, joined against the current catalog.
    ///
    /// Entries whose service or plan no longer appear in the catalog are kept
    /// with those references unset.
    pub async fn instances(&self) -> Result<Vec<Instance>> {
        let catalog = self.catalog().await?;
        let status: BrokerStatus = self
            .get_json(STATUS_PATH)
            .await
            .map_err(|e| e.context("failed to get instance status"))?;

        let instances = status.join(&catalog);
        if self.config().debug {
            for instance in instances.iter().filter(|i| !i.is_resolved()) {
                if let Some(record) = status.instances.get(&instance.id) {
                    warn!(
                        "Unknown service/plan for instance {}: {}/{}",
                        instance.id, record.service_id, record.plan_id
                    );
                }
            }
        }
        Ok(instances)
    }

    /// Provisions instance `id` from canonical service and plan identifiers.
    pub async fn create(
        &self,
        id: &str,
        service_id: &str,
        plan_id: &str,
        params: Option<Parameters>,
    ) -> Result<Instance> {
        self.provision(id, service_id, plan_id, params)
            .await
            .map_err(|e| e.context(format!("failed to create instance {}", id)))?;
        Ok(Instance::with_id(id))
    }

    /// Sends the provision request. The response body is left undecoded.
    pub(crate) async fn provision(
        &self,
        id: &str,
        service_id: &str,
        plan_id: &str,
        params: Option<Parameters>,
    ) -> Result<Received> {
        let body = encode(&ProvisionRequest::new(service_id, plan_id, params))?;
        self.call(Method::PUT, &instance_path(id), Some(body)).await
    }

    /// Updates instance `id`. The service identifier is sent as given; an
    /// empty `plan_id` keeps the current plan.
    pub async fn update(
        &self,
        id: &str,
        service_id: &str,
        plan_id: &str,
        params: Option<Parameters>,
    ) -> Result<Instance> {
        let body = encode(&UpdateRequest::new(service_id, plan_id, params))?;
        self.call(Method::PATCH, &instance_path(id), Some(body))
            .await
            .map_err(|e| e.context(format!("failed to update instance {}", id)))?;
        Ok(Instance::with_id(id))
    }

    /// Deprovisions instance `id`. An already-gone instance (410) is success.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.call(Method::DELETE, &instance_path(id), None)
            .await
            .map_err(|e| e.context(format!("failed to delete instance {}", id)))?;
        Ok(())
    }

    /// The deployment task log of instance `id`, read to the end.
    pub async fn task(&self, id: &str) -> Result<String> {
        self.text(&format!("/b/{}/task.log", id))
            .await
            .map_err(|e| e.context(format!("failed to get task log for {}", id)))
    }

    /// The deployment manifest of instance `id`, checked to be valid YAML.
    pub async fn manifest(&self, id: &str) -> Result<String> {
        let manifest = self
            .text(&format!("/b/{}/manifest.yml", id))
            .await
            .map_err(|e| e.context(format!("failed to get manifest for {}", id)))?;
        validate_yaml(&manifest, format!("invalid manifest for {}", id))?;
        Ok(manifest)
    }

    /// The credentials of instance `id` as YAML text, checked to be valid.
    pub async fn creds(&self, id: &str) -> Result<String> {
        let creds = self
            .text(&format!("/b/{}/creds.yml", id))
            .await
            .map_err(|e| e.context(format!("failed to get credentials for {}", id)))?;
        validate_yaml(&creds, format!("invalid credentials YAML for {}", id))?;
        Ok(creds)
    }

    /// The credentials of instance `id` as a key/value map.
    pub async fn creds_map(&self, id: &str) -> Result<BTreeMap<String, serde_yaml::Value>> {
        let creds = self.creds(id).await?;
        if creds.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let map: BTreeMap<String, serde_yaml::Value> =
            serde_yaml::from_str(&creds).map_err(|source| BrokerError::Validation {
                context: format!("failed to parse credentials for {}", id),
                source,
            })?;

        if self.config().debug {
            for field in EXPECTED_CREDENTIALS.iter().filter(|f| !map.contains_key(**f)) {
                warn!("Missing credential field: {}", field);
            }
        }
        Ok(map)
    }

    /// Asks the broker to redeploy instance `id`, returning its reply.
    pub async fn redeploy(&self, id: &str) -> Result<String> {
        self.text(&format!("/b/{}/redeploy", id))
            .await
            .map_err(|e| e.context(format!("failed to redeploy {}", id)))
    }
}

/// Exact match first, then the lowest identifier with `want` as a prefix.
/// An empty `want` matches nothing.
fn resolve_id<'a>(ids: impl IntoIterator<Item = &'a String>, want: &str) -> Option<String> {
    if want.is_empty() {
        return None;
    }
    let mut ids: Vec<&String> = ids.into_iter().collect();
    ids.sort();

    ids.iter()
        .find(|id| id.as_str() == want)
        .or_else(|| ids.iter().find(|id| id.starts_with(want)))
        .map(|id| id.to_string())
}
