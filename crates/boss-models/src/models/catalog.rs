/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Catalog Module
//!
//! Defines the service catalog advertised by the broker on `GET /v2/catalog`.
//!
//! ## Core Data Model
//!
//! - `Catalog`: the full offering snapshot, a list of `Service`s
//! - `Service`: an offering with its ordered list of `Plan`s
//! - `Plan`: a purchasable tier within a service
//!
//! Plan names are unique within a service but not across the whole catalog,
//! so lookups always resolve the service first.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A service plan in the broker catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan identifier
    pub id: String,
    /// Human readable plan name
    pub name: String,
    /// Plan description
    #[serde(default)]
    pub description: String,
    /// Whether the plan is free of charge
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub free: bool,
    /// Plan-level override of the service's bindable flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindable: Option<bool>,
}

/// A service in the broker catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Service identifier
    pub id: String,
    /// Human readable service name
    pub name: String,
    /// Service description
    #[serde(default)]
    pub description: String,
    /// Whether instances of this service can be bound
    #[serde(default)]
    pub bindable: bool,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether instances can change plans
    #[serde(default)]
    pub plan_updateable: bool,
    /// Plans offered by this service, in catalog order
    #[serde(default)]
    pub plans: Vec<Plan>,
    /// Platform permissions the service requires
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    /// Opaque broker metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// The broker's advertised set of services and plans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub services: Vec<Service>,
}

/// Returned when a service/plan pair is not present in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("service '{service}' / plan '{plan}' not found")]
pub struct PlanNotFound {
    pub service: String,
    pub plan: String,
}

impl Catalog {
    /// Resolves a service and plan, each given by identifier or by name.
    ///
    /// Identifiers are tried first across the whole catalog; only when no
    /// service/plan pair matches by identifier are names considered.
    pub fn plan(&self, service: &str, plan: &str) -> Result<(&Service, &Plan), PlanNotFound> {
        self.plan_by_id(service, plan)
            .or_else(|| self.find(service, plan, |s| &s.name, |p| &p.name))
            .ok_or_else(|| PlanNotFound {
                service: service.to_string(),
                plan: plan.to_string(),
            })
    }

    /// Resolves a service and plan strictly by identifier.
    pub fn plan_by_id(&self, service_id: &str, plan_id: &str) -> Option<(&Service, &Plan)> {
        self.find(service_id, plan_id, |s| &s.id, |p| &p.id)
    }

    fn find<'a>(
        &'a self,
        service: &str,
        plan: &str,
        service_key: impl Fn(&Service) -> &String,
        plan_key: impl Fn(&Plan) -> &String,
    ) -> Option<(&'a Service, &'a Plan)> {
        self.services
            .iter()
            .filter(|s| service_key(s) == service)
            .find_map(|s| {
                s.plans
                    .iter()
                    .find(|p| plan_key(p) == plan)
                    .map(|p| (s, p))
            })
    }
}
