/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Instances Module
//!
//! Service instances as reported by the broker's status endpoint (`GET /b/status`)
//! and the joined view handed to callers.
//!
//! The status endpoint returns a registry keyed by instance id:
//!
//! ```json
//! {
//!   "instances": {
//!     "my-redis": {"service_id": "redis-svc", "plan_id": "redis-small", "state": "succeeded"}
//!   },
//!   "log": "..."
//! }
//! ```
//!
//! Registry entries carry canonical ids only. The catalog and the registry can
//! drift, so an entry whose ids no longer resolve is kept with empty references
//! rather than dropped.

use crate::models::catalog::{Catalog, Plan, Service};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One entry of the broker's instance registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub plan_id: String,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub service_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_task_id: Option<String>,
}

/// Body of `GET /b/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrokerStatus {
    #[serde(default)]
    pub instances: HashMap<String, InstanceRecord>,
    /// The broker's own log text
    #[serde(default)]
    pub log: String,
}

/// A deployed service instance joined against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    /// `None` when the registry's service id is not in the current catalog
    pub service: Option<Service>,
    /// `None` when the registry's plan id is not in the current catalog
    pub plan: Option<Plan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Instance {
    /// A bare instance carrying only its identifier, as returned by
    /// create and update.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service: None,
            plan: None,
            state: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Joins a registry entry against the catalog by identifier only.
    pub fn from_record(id: &str, record: &InstanceRecord, catalog: &Catalog) -> Self {
        let resolved = catalog.plan_by_id(&record.service_id, &record.plan_id);

        Self {
            id: id.to_string(),
            service: resolved.map(|(s, _)| s.clone()),
            plan: resolved.map(|(_, p)| p.clone()),
            state: record.state.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    /// Whether both service and plan resolved against the catalog.
    pub fn is_resolved(&self) -> bool {
        self.service.is_some() && self.plan.is_some()
    }
}

impl BrokerStatus {
    /// Joins every registry entry against the catalog and returns the
    /// instances in display order (see [`sort_instances`]).
    pub fn join(&self, catalog: &Catalog) -> Vec<Instance> {
        let mut instances: Vec<Instance> = self
            .instances
            .iter()
            .map(|(id, record)| Instance::from_record(id, record, catalog))
            .collect();
        sort_instances(&mut instances);
        instances
    }
}

/// Orders instances newest first, ties broken by identifier. Instances without
/// a creation time sort after every timestamped instance.
pub fn sort_instances(instances: &mut [Instance]) {
    instances.sort_by(compare_instances);
}

fn compare_instances(a: &Instance, b: &Instance) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    }
}

/// Reads a null value as the type's default.
fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts null, an empty string, or an RFC 3339 timestamp. The zero time
/// `0001-01-01T00:00:00Z` that some brokers emit for unset fields is treated
/// as absent.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => {
            let ts = DateTime::parse_from_rfc3339(s)
                .map_err(serde::de::Error::custom)?
                .with_timezone(&Utc);
            if ts.year() <= 1 {
                Ok(None)
            } else {
                Ok(Some(ts))
            }
        }
    }
}
