//! CLI command implementations
//!
//! Each serving command loads configuration, installs logging, then runs
//! its server on a tokio runtime until Ctrl-C.

use std::io;
use std::path::Path;

use crate::http_server::companion::run_companion;
use crate::http_server::openapi::route_table;
use crate::http_server::{HttpServer, ServerConfig, ServerError};
use crate::observability::init_logging;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_routes;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config } => serve(config.as_deref()),
        Command::Companion { config } => companion(config.as_deref()),
        Command::Routes => routes(),
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

/// Start the REST API server
pub fn serve(config_path: Option<&Path>) -> CliResult<()> {
    let config = ServerConfig::load(config_path)?;
    init_logging(config.log_format);

    let served: CliResult<()> = runtime()?
        .block_on(async {
            let server = HttpServer::from_config(config).await?;
            server.start().await?;
            Ok::<(), ServerError>(())
        })
        .map_err(CliError::from);
    served.inspect_err(log_failure)
}

/// Start the companion cache API
pub fn companion(config_path: Option<&Path>) -> CliResult<()> {
    let config = ServerConfig::load(config_path)?;
    init_logging(config.log_format);

    let served: CliResult<()> = runtime()?
        .block_on(run_companion(&config))
        .map_err(CliError::from);
    served.inspect_err(log_failure)
}

/// Boot failures after logging is installed also go to the log.
fn log_failure(err: &CliError) {
    tracing::error!(code = err.code_str(), error = %err, "command failed");
}

/// Print the documented route table
pub fn routes() -> CliResult<()> {
    let stdout = io::stdout();
    write_routes(&mut stdout.lock(), &route_table())
}
