//! CLI module for postboard
//!
//! Provides command-line interface for:
//! - serve: run the REST API
//! - companion: run the companion cache API
//! - routes: print the documented route table

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{companion, routes, run, run_command, serve};
pub use errors::{CliError, CliResult};
pub use io::write_routes;
