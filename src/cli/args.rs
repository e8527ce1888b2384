//! CLI argument definitions using clap
//!
//! Commands:
//! - postboard serve [--config <path>]
//! - postboard companion [--config <path>]
//! - postboard routes

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// postboard - users and posts behind a validating REST front end
#[derive(Parser, Debug)]
#[command(name = "postboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the REST API server
    Serve {
        /// Path to configuration file (default: ./postboard.json, if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Start the companion cache API
    Companion {
        /// Path to configuration file (default: ./postboard.json, if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the documented route table and exit
    Routes,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
