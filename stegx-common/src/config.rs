//! Configuration loading and endpoint resolution
//!
//! Endpoint resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`STEGX_API_URL`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable config file is never fatal: it is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the backend endpoint
pub const ENDPOINT_ENV_VAR: &str = "STEGX_API_URL";

/// Compiled default backend endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:10000";

/// Default request timeout (video carriers can take a while to process)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// On-disk configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Backend base URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolved client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend base URL without trailing slash
    pub endpoint: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_user_agent() -> String {
    format!("stegx/{}", env!("CARGO_PKG_VERSION"))
}

impl ClientConfig {
    /// Resolve configuration from all sources
    ///
    /// `cli_endpoint` and `config_path` come from the command line; when
    /// `config_path` is `None` the platform config file is tried. A missing
    /// or unreadable file, explicit or not, is logged and skipped.
    pub fn resolve(cli_endpoint: Option<&str>, config_path: Option<&Path>) -> Result<Self> {
        let toml_config = match config_path {
            Some(path) => load_or_default(path),
            None => match default_config_path() {
                Some(path) if path.exists() => load_or_default(&path),
                _ => {
                    debug!("No config file found, using defaults");
                    TomlConfig::default()
                }
            },
        };

        Self::from_sources(
            cli_endpoint,
            std::env::var(ENDPOINT_ENV_VAR).ok().as_deref(),
            &toml_config,
        )
    }

    /// Apply the priority order to already-loaded sources
    pub fn from_sources(
        cli_endpoint: Option<&str>,
        env_endpoint: Option<&str>,
        toml_config: &TomlConfig,
    ) -> Result<Self> {
        let (endpoint, source) = if let Some(endpoint) = non_blank(cli_endpoint) {
            (endpoint, "command line")
        } else if let Some(endpoint) = non_blank(env_endpoint) {
            (endpoint, "environment")
        } else if let Some(endpoint) = non_blank(toml_config.endpoint.as_deref()) {
            (endpoint, "TOML config")
        } else {
            (DEFAULT_ENDPOINT, "compiled default")
        };

        let endpoint = normalize_endpoint(endpoint)?;
        info!("Backend endpoint: {} (from {})", endpoint, source);

        Ok(Self {
            endpoint,
            timeout_secs: toml_config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            logging: toml_config.logging.clone(),
        })
    }
}

fn load_or_default(path: &Path) -> TomlConfig {
    load_toml_config(path).unwrap_or_else(|e| {
        warn!("Ignoring config file {}: {}", path.display(), e);
        TomlConfig::default()
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validate an endpoint URL and strip trailing slashes
pub fn normalize_endpoint(endpoint: &str) -> Result<String> {
    let endpoint = endpoint.trim();
    let rest = endpoint
        .strip_prefix("http://")
        .or_else(|| endpoint.strip_prefix("https://"))
        .ok_or_else(|| {
            Error::Config(format!(
                "Endpoint must start with http:// or https://: {}",
                endpoint
            ))
        })?;

    let host = rest.split('/').next().unwrap_or_default();
    if host.trim().is_empty() {
        return Err(Error::Config(format!("Endpoint has no host: {}", endpoint)));
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

/// Platform config file location (`<config dir>/stegx/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stegx").join("config.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}: {}", path.display(), e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write a TOML config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;

    info!("Wrote config: {}", path.display());
    Ok(())
}

/// Create a starter config file at `path`
///
/// Refuses to replace an existing file unless `overwrite` is set.
pub fn init_toml_config(config: &TomlConfig, path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(Error::Config(format!(
            "Config file already exists: {}",
            path.display()
        )));
    }
    write_toml_config(config, path)
}
