//! Server Configuration
//!
//! Loaded from an optional JSON file, then `.env`, then environment
//! overrides. Every field has a default, so an empty file (or none) is a
//! valid configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheConnectMode;

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "postboard.json";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

/// Relational store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// sqlx SQLite URL, used by the `sqlite` backend
    pub url: String,
    pub acquire_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: "sqlite://postboard.db".to_string(),
            acquire_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

/// Key-value cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub url: String,
    pub connection: CacheConnectMode,
    pub timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            url: "redis://127.0.0.1:6379".to_string(),
            connection: CacheConnectMode::Shared,
            timeout_ms: 2_000,
        }
    }
}

impl CacheConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Raw relational pool settings; no URL means the pool is not available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub url: Option<String>,
    pub acquire_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            url: None,
            acquire_timeout_ms: 5_000,
        }
    }
}

impl DriverConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

/// Upstream companion API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 5_000,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Bind address of the companion cache API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    pub host: String,
    pub port: u16,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 5000,
        }
    }
}

impl CompanionConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Largest accepted request body (default: 100 KiB)
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Per-request deadline; `null` disables it
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: Option<u64>,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub driver: DriverConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub companion: CompanionConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_body_limit() -> usize {
    100 * 1024
}

fn default_request_timeout() -> Option<u64> {
    Some(30_000)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            body_limit_bytes: default_body_limit(),
            request_timeout_ms: default_request_timeout(),
            log_format: LogFormat::default(),
            store: StoreConfig::default(),
            cache: CacheConfig::default(),
            driver: DriverConfig::default(),
            upstream: UpstreamConfig::default(),
            companion: CompanionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration for a process.
    ///
    /// An explicit `path` must exist; the default path may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        dotenvy::dotenv().ok();
        config.apply_env(|name| std::env::var(name).ok())?;
        config.check()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("POSTBOARD_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("POSTBOARD_PORT") {
            self.port = parse_port("POSTBOARD_PORT", port)?;
        }
        // A sqlite: DATABASE_URL backs the store; any other scheme is a
        // relational pool URL unless POSTGRES_URL names one.
        let database_url = lookup("DATABASE_URL");
        if let Some(url) = lookup("POSTGRES_URL") {
            self.driver.url = Some(url);
        }
        match database_url {
            Some(url) if url.starts_with("sqlite:") => {
                self.store.backend = StoreBackend::Sqlite;
                self.store.url = url;
            }
            Some(url) if self.driver.url.is_none() => self.driver.url = Some(url),
            _ => {}
        }
        if let Some(url) = lookup("REDIS_URL") {
            self.cache.backend = CacheBackend::Redis;
            self.cache.url = url;
        }
        if let Some(url) = lookup("REDIS_API_URL") {
            self.upstream.base_url = Some(url);
        }
        if let Some(port) = lookup("COMPANION_PORT") {
            self.companion.port = parse_port("COMPANION_PORT", port)?;
        }
        Ok(())
    }

    /// Reject combinations that cannot start.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Sqlite && !self.store.url.starts_with("sqlite:") {
            return Err(ConfigError::Invalid(format!(
                "store url must be a sqlite: URL, got {:?}",
                self.store.url
            )));
        }
        if self.body_limit_bytes == 0 {
            return Err(ConfigError::Invalid("body_limit_bytes must be positive".into()));
        }
        Ok(())
    }
}

fn parse_port(name: &'static str, value: String) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}
