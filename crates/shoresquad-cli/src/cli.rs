//! Command-line surface for `shoresquad`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "shoresquad", version, about = "Drive the ShoreSquad offline cache manager", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, env = "SHORESQUAD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the effective configuration to the config file
    Init,
    /// Install the current version's app shell, then activate it
    Install {
        /// Stop after install, leaving the new version waiting
        #[arg(long)]
        no_activate: bool,
    },
    /// Route one request through the worker
    Fetch {
        /// Absolute URL or a path relative to the origin
        url: String,
        #[arg(long, default_value = "GET")]
        method: String,
        /// Issue the request in no-cors mode
        #[arg(long)]
        no_cors: bool,
    },
    /// Deliver a push message
    Push {
        /// Raw JSON payload, e.g. '{"body":"Cleanup starts in 1 hour!"}'
        #[arg(long)]
        payload: Option<String>,
    },
    /// Click the default notification with the given windows open
    Click {
        /// URL of an open window (repeatable)
        #[arg(long = "window")]
        windows: Vec<String>,
    },
    /// List cache generations and their entries
    Status,
}
