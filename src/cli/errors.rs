//! CLI-specific error types
//!
//! Every CLI error is fatal: it is printed to stderr and the process exits 1.

use std::io;

use thiserror::Error;

use crate::http_server::{ConfigError, ServerError};

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file or environment error
    #[error("POSTBOARD_CLI_CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    /// Startup or serving failed
    #[error("POSTBOARD_CLI_BOOT_FAILED: {0}")]
    Boot(#[from] ServerError),

    /// I/O error (stdout, runtime creation)
    #[error("POSTBOARD_CLI_IO_ERROR: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        match self {
            CliError::Config(_) => "POSTBOARD_CLI_CONFIG_ERROR",
            CliError::Boot(_) => "POSTBOARD_CLI_BOOT_FAILED",
            CliError::Io(_) => "POSTBOARD_CLI_IO_ERROR",
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
