//! Command-line argument parsing for Quarry.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Quarry command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "quarry", about = "Quarry multiplayer mining client")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Half-width of the generated world, in columns.
    #[arg(long)]
    pub world_radius: Option<i32>,

    /// Realtime channel to join.
    #[arg(long)]
    pub channel: Option<String>,

    /// Outbound presence broadcast interval in milliseconds.
    #[arg(long)]
    pub broadcast_interval_ms: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(radius) = args.world_radius {
            self.world.radius = radius;
        }
        if let Some(ref channel) = args.channel {
            self.network.channel_name = channel.clone();
        }
        if let Some(interval) = args.broadcast_interval_ms {
            self.network.broadcast_interval_ms = interval;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
