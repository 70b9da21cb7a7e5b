/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

/// Command-line interface module for the boss client.
pub mod commands;
use clap::{Args, Parser, Subcommand};

/// CLI configuration structure.
#[derive(Parser, Debug)]
#[command(name = "boss", author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Options accepted anywhere on the command line. Each one overrides the
/// corresponding configuration setting.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file layered over the built-in defaults
    #[arg(long, global = true, env = "BOSS_CONFIG")]
    pub config: Option<String>,

    /// Enable debugging output
    #[arg(short = 'D', long, global = true)]
    pub debug: bool,

    /// Trace HTTP(s) calls. Implies --debug
    #[arg(short = 'T', long, global = true)]
    pub trace: bool,

    /// URL of the service broker
    #[arg(short = 'U', long, global = true, env = "BLACKSMITH_URL")]
    pub url: Option<String>,

    /// Skip verification of the API endpoint's certificate
    #[arg(short = 'k', long, global = true, env = "BLACKSMITH_SKIP_VERIFY")]
    pub skip_ssl_validation: bool,

    /// Broker username
    #[arg(short = 'u', long, global = true, env = "BLACKSMITH_USERNAME")]
    pub username: Option<String>,

    /// Broker password
    #[arg(
        short = 'p',
        long,
        global = true,
        env = "BLACKSMITH_PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the service broker log
    Log,

    /// Show all deployed service instances
    List {
        /// Include service and plan identifiers
        #[arg(short, long)]
        long: bool,
    },

    /// Print the catalog of services and plans
    Catalog {
        /// Include service and plan identifiers
        #[arg(short, long)]
        long: bool,
    },

    /// Deploy a new instance of a service and plan
    Create {
        /// Service and plan, by name or identifier
        #[arg(value_name = "SERVICE/PLAN")]
        service_plan: String,

        /// Service instance id (a random UUID when omitted)
        #[arg(short, long)]
        id: Option<String>,

        /// Follow the deployment task log after creating
        #[arg(short, long)]
        follow: bool,

        /// Wait for asynchronous provisioning to finish
        #[arg(long)]
        wait: bool,
    },

    /// Move a service instance to another service and plan
    Update {
        /// Full or partial instance id
        instance: String,

        /// Service and plan, by name or identifier
        #[arg(value_name = "SERVICE/PLAN")]
        service_plan: String,
    },

    /// Delete a deployed service instance
    Delete {
        /// Instance id
        instance: String,
    },

    /// Show the deployment task log for an instance
    Task {
        /// Full or partial instance id
        instance: String,

        /// Keep streaming new output until interrupted
        #[arg(short, long)]
        follow: bool,
    },

    /// Print an instance's deployment manifest
    Manifest {
        /// Full or partial instance id
        instance: String,
    },

    /// Print out credentials for a service instance
    Creds {
        /// Full or partial instance id
        instance: String,

        /// Print the credentials as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Redeploy a service instance from its saved manifest
    Redeploy {
        /// Full or partial instance id
        instance: String,
    },
}

/// Parses command-line arguments into the Cli structure.
///
/// # Returns
/// * `Cli` - Parsed CLI configuration
pub fn parse_cli() -> Cli {
    Cli::parse()
}
