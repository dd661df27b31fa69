//! greenhouse-twin
//!
//! Command line front end for the greenhouse digital twin. Every command
//! opens the store from its root manifest, runs one operation against the
//! live layer, saves once and prints a summary.
//!
//! Run with: cargo run -p twin_cli -- evaluate --sync
//!       or: greenhouse-twin --root greenhouse/greenhouse.json inspect

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use twin_control::TwinConfig;

#[derive(Parser)]
#[command(name = "greenhouse-twin")]
#[command(about = "Greenhouse digital twin on a layered scene store", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root manifest of the store, overriding the configuration
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Author the demo greenhouse store
    Init {
        /// Overwrite an existing store
        #[arg(long)]
        force: bool,
    },
    /// Print the layer stack, prim tree and device readings
    Inspect {
        /// Limit the tree to this many levels below the root
        #[arg(long)]
        depth: Option<usize>,
    },
    /// Write sensor, actuator or zone values to the live layer
    Set(commands::SetArgs),
    /// Run the control rules once
    Evaluate {
        /// Rebind plant materials afterwards
        #[arg(long)]
        sync: bool,
    },
    /// Apply a JSON recommendation file
    Apply {
        file: PathBuf,
    },
    /// Rebind plant materials of every zone from its status
    Sync,
    /// Show or change one zone, e.g. B03-C
    Zone {
        id: String,
        /// Set the zone status before syncing (ok, dry, wet, shaded, stressed)
        #[arg(long)]
        status: Option<String>,
        /// List the plants in the zone
        #[arg(long)]
        list: bool,
    },
    /// Print a context snapshot as JSON
    Snapshot {
        /// Read the snapshot from a JSON file instead of the store
        #[arg(long, conflicts_with = "default")]
        from_file: Option<PathBuf>,
        /// Print the built-in default context
        #[arg(long)]
        default: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}: {}", e.class(), e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> twin_control::Result<()> {
    let mut config = TwinConfig::load(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.store.root = root;
    }

    match cli.cmd {
        Command::Init { force } => commands::init(&config, force),
        Command::Inspect { depth } => commands::inspect(config, depth),
        Command::Set(args) => commands::set(config, &args),
        Command::Evaluate { sync } => commands::evaluate(config, sync),
        Command::Apply { file } => commands::apply(config, &file),
        Command::Sync => commands::sync(config),
        Command::Zone { id, status, list } => commands::zone(config, &id, status.as_deref(), list),
        Command::Snapshot { from_file, default } => {
            commands::snapshot(config, from_file.as_deref(), default)
        }
    }
}
