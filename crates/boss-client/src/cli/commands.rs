/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # CLI Commands Module
//!
//! Implements the subcommands of the `boss` binary.
//!
//! ## Startup Sequence
//!
//! ```mermaid
//! flowchart TD
//!     A[Load Settings] --> B[Apply CLI overrides]
//!     B --> C[Init Logger]
//!     C --> D[Open BrokerClient]
//!     D --> E[Run subcommand]
//! ```
//!
//! Output is plain text on stdout; diagnostics go to the logger on stderr.
//! Following a task log stops cleanly on Ctrl-C.

use super::GlobalArgs;
use crate::client::{BrokerClient, ClientConfig};
use crate::error::ErrorKind;
use boss_models::models::catalog::Catalog;
use boss_models::models::instances::Instance;
use boss_utils::config::Settings;
use boss_utils::logging::prelude::*;
use std::error::Error;
use tokio::signal::ctrl_c;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type CommandResult<T = ()> = Result<T, Box<dyn Error>>;

const UNKNOWN: &str = "(unknown)";
const NONE: &str = "(none)";

/// Loads settings, applies command-line overrides, initialises logging and
/// opens a broker client.
pub fn connect(global: &GlobalArgs) -> CommandResult<BrokerClient> {
    let settings = Settings::new(global.config.clone())?;

    let level = boss_utils::logging::effective_level(&settings.log.level, global.debug, global.trace);
    boss_utils::logging::init_with_format(&level, &settings.log.format)?;

    let config = client_config(&settings, global);
    debug!("Connecting to {:?}", config);
    Ok(config.open()?)
}

fn client_config(settings: &Settings, global: &GlobalArgs) -> ClientConfig {
    let mut config = ClientConfig::from_settings(settings);
    if let Some(url) = &global.url {
        config.url = url.clone();
    }
    if let Some(username) = &global.username {
        config.username = username.clone();
    }
    if let Some(password) = &global.password {
        config.password = password.clone();
    }
    config.insecure_skip_verify |= global.skip_ssl_validation;
    config.debug = global.debug || global.trace;
    config.trace = global.trace;
    config
}

/// Splits a `service/plan` argument.
fn split_service_plan(arg: &str) -> CommandResult<(&str, &str)> {
    match arg.split_once('/') {
        Some((service, plan)) if !service.is_empty() && !plan.is_empty() => Ok((service, plan)),
        _ => Err(format!("expected service/plan, got '{}'", arg).into()),
    }
}

pub async fn log(client: &BrokerClient) -> CommandResult {
    println!("{}", client.log().await?);
    Ok(())
}

pub async fn list(client: &BrokerClient, long: bool) -> CommandResult {
    let instances = client.instances().await?;
    if instances.is_empty() {
        println!("No service instances found.");
        return Ok(());
    }
    print!("{}", render_instances(&instances, long));
    Ok(())
}

pub async fn catalog(client: &BrokerClient, long: bool) -> CommandResult {
    let catalog = client.catalog().await?;
    print!("{}", render_catalog(&catalog, long));
    Ok(())
}

pub async fn create(
    client: &BrokerClient,
    service_plan: &str,
    id: Option<String>,
    follow: bool,
    wait: bool,
) -> CommandResult {
    let (service_name, plan_name) = split_service_plan(service_plan)?;
    let (service, plan) = client.plan(service_name, plan_name).await?;
    let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());

    if wait {
        client
            .create_and_wait(&id, &service.id, &plan.id, None, None)
            .await?;
    } else {
        client.create(&id, &service.id, &plan.id, None).await?;
    }
    println!("{}/{} instance {} created.", service_name, plan_name, id);

    if follow {
        println!("\ntailing deployment task log...");
        follow_task(client, &id).await?;
    }
    Ok(())
}

pub async fn update(client: &BrokerClient, instance: &str, service_plan: &str) -> CommandResult {
    let id = client.resolve(instance).await?;
    let (service_name, plan_name) = split_service_plan(service_plan)?;
    let (service, plan) = client.plan(service_name, plan_name).await?;

    client.update(&id, &service.id, &plan.id, None).await?;
    println!("{} instance updated to {}/{}.", id, service_name, plan_name);
    Ok(())
}

pub async fn delete(client: &BrokerClient, instance: &str) -> CommandResult {
    client.delete(instance).await?;
    println!("{} instance deleted.", instance);
    Ok(())
}

pub async fn task(client: &BrokerClient, instance: &str, follow: bool) -> CommandResult {
    let id = client.resolve(instance).await?;
    println!("# {}", id);
    if follow {
        return follow_task(client, &id).await;
    }
    println!("{}", client.task(&id).await?);
    Ok(())
}

pub async fn manifest(client: &BrokerClient, instance: &str) -> CommandResult {
    let id = client.resolve(instance).await?;
    let manifest = client.manifest(&id).await?;
    println!("# {}", id);
    println!("{}", manifest);
    Ok(())
}

pub async fn creds(client: &BrokerClient, instance: &str, json: bool) -> CommandResult {
    let id = client.resolve(instance).await?;
    if json {
        let creds = client.creds_map(&id).await?;
        println!("{}", serde_json::to_string_pretty(&creds)?);
        return Ok(());
    }
    let creds = client.creds(&id).await?;
    println!("# {}", id);
    println!("{}", creds);
    Ok(())
}

pub async fn redeploy(client: &BrokerClient, instance: &str) -> CommandResult {
    let id = client.resolve(instance).await?;
    let reply = client.redeploy(&id).await?;
    println!("# {}", id);
    println!("{}", reply);
    Ok(())
}

/// Streams the task log of `id` until the broker closes it or Ctrl-C.
async fn follow_task(client: &BrokerClient, id: &str) -> CommandResult {
    let token = CancellationToken::new();
    let client = client.with_cancellation(token.clone());

    let interrupt = token.clone();
    let watcher = tokio::spawn(async move {
        if ctrl_c().await.is_ok() {
            info!("Interrupted, closing task log");
            interrupt.cancel();
        }
    });

    let result = stream_lines(&client, id).await;
    watcher.abort();

    match result {
        Err(e) if e.kind() == ErrorKind::Cancelled => Ok(()),
        other => Ok(other?),
    }
}

async fn stream_lines(client: &BrokerClient, id: &str) -> crate::error::Result<()> {
    let mut stream = client.stream_task(id, true).await?;
    while let Some(line) = stream.next_line().await? {
        println!("{}", line);
    }
    Ok(())
}

/// One line per instance: id, service and plan names, and with `long` the
/// service and plan identifiers. Fields are tab-separated.
pub fn render_instances(instances: &[Instance], long: bool) -> String {
    let mut out = String::new();
    for instance in instances {
        let service = instance.service.as_ref();
        let plan = instance.plan.as_ref();
        let service_name = service.map_or(UNKNOWN, |s| s.name.as_str());
        let plan_name = plan.map_or(UNKNOWN, |p| p.name.as_str());

        let mut fields = vec![instance.id.as_str(), service_name];
        if long {
            fields.push(service.map_or("-", |s| s.id.as_str()));
        }
        fields.push(plan_name);
        if long {
            fields.push(plan.map_or("-", |p| p.id.as_str()));
        }

        out.push_str(&fields.join("\t"));
        out.push('\n');
    }
    out
}

/// One line per service: name, plan names and tags, and with `long` the
/// service and plan identifiers.
pub fn render_catalog(catalog: &Catalog, long: bool) -> String {
    let mut out = String::new();
    for service in &catalog.services {
        let plans = list_or_none(service.plans.iter().map(|p| p.name.as_str()));
        let tags = list_or_none(service.tags.iter().map(String::as_str));

        if long {
            let ids = list_or_none(service.plans.iter().map(|p| p.id.as_str()));
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\n",
                service.name, service.id, plans, ids, tags
            ));
        } else {
            out.push_str(&format!("{}\t{}\t{}\n", service.name, plans, tags));
        }
    }
    out
}

fn list_or_none<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let joined = items.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        NONE.to_string()
    } else {
        joined
    }
}
