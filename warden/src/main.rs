//! Main entry point for the warden binary
//!
//! `serve` supervises the worker and runs the auto-update loop until Ctrl+C.
//! The other subcommands run a single admin operation and print its result
//! as JSON.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::signal;

use shared::{Component, component_info, logging};
use warden::Host;
use warden::services::ArchiveOwnership;
use warden::settings::SettingsArgs;

/// Self-supervising service manager
#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Supervises a worker process and keeps its installation up to date")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "WARDEN_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Supervise the worker and run scheduled updates (default)
    Serve,
    /// Compare the installed revision with the remote branch tip
    CheckUpdate,
    /// Update the installation now
    ApplyUpdate,
    /// Show or change the auto-update schedule
    AutoUpdate {
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: Option<bool>,
        /// Daily cutoff, HH:MM
        #[arg(long)]
        time: Option<String>,
    },
    /// Install a transit-feed archive
    InstallFeed {
        #[arg(long)]
        feed: String,
        #[arg(long)]
        archive: PathBuf,
    },
    /// Show when each transit feed was last installed
    FeedInfo,
    /// Report on the git working copy
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    logging::init_tracing_with_level(Some(&cli.log_level));

    let settings = cli.settings.into_settings().context("Invalid settings")?;
    let mut host = Host::build(settings).context("Failed to initialize warden")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            logging::log_startup(Component::Host, "warden service manager");
            host.spawn_background();

            signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
            logging::log_shutdown(Component::Host, "Received Ctrl+C signal");
            host.shutdown().await;
        }
        Command::CheckUpdate => print_json(&host.admin().check_update().await)?,
        Command::ApplyUpdate => print_json(&host.admin().apply_update().await)?,
        Command::AutoUpdate { enabled, time } => {
            let admin = host.admin();
            let config = if enabled.is_none() && time.is_none() {
                admin.auto_update_config()
            } else {
                let current = admin.auto_update_config();
                admin
                    .save_auto_update(enabled.unwrap_or(current.enabled), time.as_deref().unwrap_or(&current.time))
                    .context("Failed to save auto-update settings")?
            };
            print_json(&config)?;
        }
        Command::InstallFeed { feed, archive } => {
            let stamp = host
                .admin()
                .install_feed(&feed, &archive, ArchiveOwnership::Caller)
                .await
                .with_context(|| format!("Failed to install {feed} feed"))?;
            component_info!(Component::Feeds, "Feed {} installed at {}", feed, stamp);
            print_json(&host.admin().gtfs_update_info())?;
        }
        Command::FeedInfo => print_json(&host.admin().gtfs_update_info())?,
        Command::Doctor => print_json(&host.admin().diagnostics().await)?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
