use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "nutanix-collector")]
#[command(about = "Collects Nutanix Prism Central inventory into a resource graph")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect clusters and virtual machines from all configured Prism Centrals
    Collect {
        /// Path to the config file (default: <config dir>/nutanix-collector/config.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,

        /// Collector to skip (repeatable, e.g. virtual_machines)
        #[arg(short, long)]
        disable: Vec<String>,

        /// Inventory API base URL to post the graph to
        #[arg(short, long)]
        post: Option<String>,
    },

    /// Configuration helpers
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print an example configuration
    Example {
        /// Output format (json or yaml)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Check a config file without contacting Prism Central
    Validate {
        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
