//! RoomView CLI - scripted AR sessions against the simulated platform

#![warn(missing_docs)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

mod commands;
mod config;

use commands::{show_config, simulate};

#[derive(Parser)]
#[command(name = "roomview")]
#[command(about = "RoomView AR placement engine tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, env = "ROOMVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted AR session and print its status events
    Simulate {
        /// Number of frames to run
        #[arg(long)]
        frames: Option<u64>,

        /// Frames on which the user taps (repeatable)
        #[arg(long = "tap-at")]
        tap_at: Vec<u64>,

        /// Frames on which the user resets (repeatable)
        #[arg(long = "reset-at")]
        reset_at: Vec<u64>,

        /// Model asset to load
        #[arg(long)]
        model: Option<String>,

        /// Frames an anchor request stays pending
        #[arg(long)]
        anchor_latency: Option<u32>,

        /// Device does not support immersive AR
        #[arg(long)]
        unsupported: bool,

        /// User denies the camera permission
        #[arg(long)]
        deny_permission: bool,

        /// Platform declines the anchors feature
        #[arg(long)]
        no_anchors: bool,

        /// Platform rejects plane-constrained hit-testing
        #[arg(long)]
        no_plane_hit_test: bool,

        /// Platform rejects hit-testing altogether
        #[arg(long)]
        no_hit_test: bool,

        /// Platform rejects every anchor request
        #[arg(long)]
        fail_anchors: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to this path
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.debug { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config).context("failed to load configuration")?;

    match cli.command {
        Commands::Simulate {
            frames,
            tap_at,
            reset_at,
            model,
            anchor_latency,
            unsupported,
            deny_permission,
            no_anchors,
            no_plane_hit_test,
            no_hit_test,
            fail_anchors,
            json,
        } => {
            let scenario = &mut config.scenario;
            if let Some(frames) = frames {
                scenario.frames = frames;
            }
            if !tap_at.is_empty() {
                scenario.tap_at = tap_at;
            }
            if !reset_at.is_empty() {
                scenario.reset_at = reset_at;
            }
            if let Some(model) = model {
                scenario.asset = model;
            }

            // Switches only ever take capabilities away
            let profile = &mut config.simulation;
            if let Some(latency) = anchor_latency {
                profile.anchor_latency_frames = latency;
            }
            profile.supported &= !unsupported;
            profile.permission_denied |= deny_permission;
            profile.grant_anchors &= !no_anchors;
            profile.plane_hit_test &= !no_plane_hit_test;
            profile.hit_test &= !no_hit_test;
            profile.fail_anchor_creation |= fail_anchors;

            simulate::simulate(&config, json).await?;
        }

        Commands::Config { write } => {
            show_config::show_config(&config, write)?;
        }
    }

    Ok(())
}
