//! Configuration loading
//!
//! Settings are resolved in this priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is not an error. A config file that exists but
//! cannot be read or parsed is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DAPR_HOST: &str = "localhost";
pub const DEFAULT_DAPR_HTTP_PORT: u16 = 3500;
pub const DEFAULT_BINDING_NAME: &str = "mentor-db";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_PORT: &str = "SERVER_PORT";
pub const ENV_DAPR_HOST: &str = "DAPR_HOST";
pub const ENV_DAPR_HTTP_PORT: &str = "DAPR_HTTP_PORT";
pub const ENV_BINDING_NAME: &str = "DB_BINDING_NAME";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "MENTOR_REQUEST_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    /// HTTP server port
    pub port: Option<u16>,
    /// Host of the Dapr sidecar
    pub dapr_host: Option<String>,
    /// HTTP port of the Dapr sidecar
    pub dapr_http_port: Option<u16>,
    /// Name of the PostgreSQL output binding component
    pub binding_name: Option<String>,
    /// Per-request deadline in milliseconds
    pub request_timeout_ms: Option<u64>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Explicit config file; must exist when given
    pub config_file: Option<PathBuf>,
    pub port: Option<u16>,
    pub dapr_host: Option<String>,
    pub dapr_http_port: Option<u16>,
    pub binding_name: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub port: u16,
    pub dapr_host: String,
    pub dapr_http_port: u16,
    pub binding_name: String,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            dapr_host: DEFAULT_DAPR_HOST.to_string(),
            dapr_http_port: DEFAULT_DAPR_HTTP_PORT,
            binding_name: DEFAULT_BINDING_NAME.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration from CLI overrides, environment, TOML and defaults
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let toml_config = match &overrides.config_file {
            Some(path) => TomlConfig::load(path)?,
            None => match find_config_file() {
                Some(path) => {
                    debug!("Using config file {}", path.display());
                    TomlConfig::load(&path)?
                }
                None => TomlConfig::default(),
            },
        };

        let env_config = EnvConfig::from_env()?;
        Self::merge(overrides, &env_config, &toml_config)
    }

    /// Merge the layers without touching the process environment or filesystem
    pub fn merge(
        overrides: &ConfigOverrides,
        env_config: &EnvConfig,
        toml_config: &TomlConfig,
    ) -> Result<Self> {
        let defaults = Self::default();

        let request_timeout_ms = overrides
            .request_timeout_ms
            .or(env_config.request_timeout_ms)
            .or(toml_config.request_timeout_ms)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        if request_timeout_ms == 0 {
            return Err(Error::Config("request_timeout_ms must be greater than 0".to_string()));
        }

        let binding_name = overrides
            .binding_name
            .clone()
            .or_else(|| env_config.binding_name.clone())
            .or_else(|| toml_config.binding_name.clone())
            .unwrap_or(defaults.binding_name);
        if binding_name.trim().is_empty() {
            return Err(Error::Config("binding_name must not be empty".to_string()));
        }

        Ok(Self {
            port: overrides
                .port
                .or(env_config.port)
                .or(toml_config.port)
                .unwrap_or(defaults.port),
            dapr_host: overrides
                .dapr_host
                .clone()
                .or_else(|| env_config.dapr_host.clone())
                .or_else(|| toml_config.dapr_host.clone())
                .unwrap_or(defaults.dapr_host),
            dapr_http_port: overrides
                .dapr_http_port
                .or(env_config.dapr_http_port)
                .or(toml_config.dapr_http_port)
                .unwrap_or(defaults.dapr_http_port),
            binding_name,
            request_timeout: Duration::from_millis(request_timeout_ms),
            log_level: overrides
                .log_level
                .clone()
                .or_else(|| env_config.log_level.clone())
                .or_else(|| toml_config.logging.level.clone())
                .unwrap_or(defaults.log_level),
        })
    }

    /// Base URL of the Dapr sidecar HTTP API
    pub fn dapr_base_url(&self) -> String {
        format!("http://{}:{}", self.dapr_host, self.dapr_http_port)
    }
}

/// Values read from environment variables
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub port: Option<u16>,
    pub dapr_host: Option<String>,
    pub dapr_http_port: Option<u16>,
    pub binding_name: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub log_level: Option<String>,
}

impl EnvConfig {
    /// Read the environment; a set-but-unparseable value is an error
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: env_parsed(ENV_PORT)?,
            dapr_host: env_string(ENV_DAPR_HOST),
            dapr_http_port: env_parsed(ENV_DAPR_HTTP_PORT)?,
            binding_name: env_string(ENV_BINDING_NAME),
            request_timeout_ms: env_parsed(ENV_REQUEST_TIMEOUT_MS)?,
            log_level: env_string(ENV_LOG_LEVEL),
        })
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid value for {}={:?}: {}", name, raw, e))),
        None => Ok(None),
    }
}

/// Locate the config file: user config dir first, then /etc
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("mentor").join("config.toml"));
    let system_config = PathBuf::from("/etc/mentor/config.toml");

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|path| path.exists())
}
