//! Application configuration.
//!
//! - `datasize` - human readable byte sizes
//! - `logging` - log level/format and subscriber setup

mod datasize;
mod logging;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::specs::DomainSpec;

pub use datasize::DataSize;
pub use logging::{LogFormat, LoggingConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid data size '{0}', expected a number with optional b, kb or mb suffix")]
    InvalidDataSize(String),
    #[error("unsupported config format '{0}', expected .yaml, .yml or .json")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Virtual host to domain spec
    #[serde(default)]
    pub domains: BTreeMap<String, DomainSpec>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_read_header_timeout_ms")]
    pub read_header_timeout_ms: u64,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    #[serde(default)]
    pub request: RequestConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RequestConfig {
    #[serde(default = "default_max_body_size")]
    pub max_body_size: DataSize,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Prometheus endpoint. Disabled unless a port is given.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MetricsConfig {
    pub port: Option<u16>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3498
}

fn default_read_header_timeout_ms() -> u64 {
    100
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

fn default_max_body_size() -> DataSize {
    DataSize::megabytes(10)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            read_header_timeout_ms: default_read_header_timeout_ms(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            request: RequestConfig::default(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_body_size: default_max_body_size(),
        }
    }
}

impl ServerConfig {
    /// `host:port`, resolved when the listener binds.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Metrics endpoint address on the server host.
    pub fn metrics_address(&self, port: u16) -> String {
        format!("{}:{}", self.host, port)
    }

    pub fn read_header_timeout(&self) -> Duration {
        Duration::from_millis(self.read_header_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl AppConfig {
    /// Load from a `.yaml`, `.yml` or `.json` file and validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let config: AppConfig = match extension.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_owned()).into()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(host) = self.domains.keys().find(|host| host.trim().is_empty()) {
            anyhow::bail!("domain host names must not be empty (got {host:?})");
        }

        if self.server.request.max_body_size.as_bytes() == 0 {
            anyhow::bail!("server.request.max_body_size must be greater than zero");
        }

        if self.server.host.trim().is_empty() {
            anyhow::bail!("server.host must not be empty");
        }

        Ok(())
    }
}
