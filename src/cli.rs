//! Command-line interface for driving the lifecycle manager.
//!
//! This is operator tooling: each subcommand performs one lifecycle operation
//! against the configured engine and prints the resulting payload as JSON.
//! Note that the expiry failsafe armed by `start` lives in the invoking
//! process; a long-running host (such as the HTTP service fronting this
//! crate) owns the timers, and the caller is in any case expected to track
//! container uptime itself.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{ConfigDiscovery, RangekeeperConfig};
use crate::orchestrator::{ContainerLifecycleManager, StartRequest};

/// Provision and tear down short-lived exercise containers.
#[derive(Debug, Parser)]
#[command(name = "rangekeeper", version, about)]
pub struct Cli {
    /// Path to a configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Lifecycle operations.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pull an exercise image and start a container for it
    Start {
        /// Competition the exercise belongs to
        #[arg(long)]
        competition_name: String,
        /// Exercise within the competition
        #[arg(long)]
        exercise_name: String,
        /// Competition instance identifier
        #[arg(long)]
        competition_uuid: Uuid,
        /// Image reference to pull and run
        #[arg(long)]
        image_link: String,
        /// Port the exercise service listens on inside the container
        #[arg(long)]
        port: u16,
        /// Lifetime in seconds before the expiry failsafe tears it down
        #[arg(long)]
        time_alive: i64,
    },

    /// Stop and remove a container, leaving its image in place
    Shutdown {
        /// Engine-assigned container identifier
        container_id: String,
    },

    /// Stop and remove a container, then force-remove its image
    Delete {
        /// Engine-assigned container identifier
        container_id: String,
    },

    /// Show configuration discovery information
    Config,
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Config => {
            ConfigDiscovery::show_discovery_info();
            Ok(())
        }

        Command::Start {
            competition_name,
            exercise_name,
            competition_uuid,
            image_link,
            port,
            time_alive,
        } => {
            let manager = ContainerLifecycleManager::new(config)?;
            let request = StartRequest {
                competition_name,
                exercise_name,
                competition_uuid,
                image_link,
                port,
                time_alive,
            };

            let response = manager.start(&request).await?;
            print_json(&response)
        }

        Command::Shutdown { container_id } => {
            let manager = ContainerLifecycleManager::new(config)?;
            let response = manager.shutdown(&container_id).await?;
            print_json(&response)
        }

        Command::Delete { container_id } => {
            let manager = ContainerLifecycleManager::new(config)?;
            let response = manager.delete(&container_id).await?;
            print_json(&response)
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<RangekeeperConfig> {
    match path {
        Some(path) => RangekeeperConfig::from_toml_file(path)
            .with_context(|| format!("failed to load configuration from {path:?}")),
        None => ConfigDiscovery::discover().context("configuration discovery failed"),
    }
}

fn print_json<T: Serialize>(payload: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}
