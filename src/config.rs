//! Server binary configuration
//!
//! Loaded once at startup from `config.toml` plus `STATIC_FRONT`-prefixed
//! environment variables. The library itself takes no configuration; these
//! settings only wire the standalone server binary.

use std::net::SocketAddr;

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    /// Directories served under URL prefixes
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads; defaults to the CPU count
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Tracing filter directive, e.g. `info` or `static_front=debug`
    pub level: String,
}

/// One `(root directory, URL prefix)` registration
#[derive(Debug, Deserialize, Clone)]
pub struct MountConfig {
    pub root: String,
    pub prefix: String,
}

/// Cache policy configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    /// Logical paths starting with any of these are served with the
    /// long-lived immutable cache directive
    #[serde(default)]
    pub immutable_prefixes: Vec<String>,
}

impl Config {
    /// Load configuration from `config.toml` in the working directory.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from the specified file path (without extension).
    /// The file is optional; defaults and environment variables apply either
    /// way.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("STATIC_FRONT").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|err| format!("Invalid address: {err}"))
    }
}
