//! Mo CLI: run a head and emotion tracking session from the terminal.
//!
//! Usage:
//!   mo run [OPTIONS]         Track a synthetic face and print snapshots
//!   mo simulate [OPTIONS]    Drive the head filter offline toward a target pose
//!   mo config [--write]      Show or write the configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mo_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "mo",
    about = "Webcam head and emotion tracking for character animation",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/mo/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live tracking session against synthetic collaborators
    Run(commands::run::RunArgs),

    /// Drive the head filter from the zero pose toward a fixed target
    Simulate {
        /// Target position as "x,y,z"
        #[arg(long, default_value = "0.5,0,0", allow_hyphen_values = true)]
        target: String,

        /// Target rotation as "pitch,roll,yaw"
        #[arg(long, default_value = "0,0,0", allow_hyphen_values = true)]
        rotation: String,

        /// Number of filter steps (one per captured frame)
        #[arg(long, default_value = "300")]
        frames: usize,

        /// Print every N-th step
        #[arg(long, default_value = "30")]
        every: usize,

        /// Emit one JSON object per printed step
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the default configuration instead of printing
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    mo_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Run(args) => commands::run::run(config, args).await,
        Commands::Simulate {
            target,
            rotation,
            frames,
            every,
            json,
        } => commands::simulate::run(&config, &target, &rotation, frames, every, json),
        Commands::Config { write } => commands::config::run(&config, cli.config, write),
    }
}
