//! Logging configuration and subscriber installation.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    #[default]
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `dito=debug,hyper=warn`
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// `RUST_LOG` takes precedence over the configured level.
    pub fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .with_context(|| format!("invalid log level '{}'", self.level)),
        }
    }

    /// Install the global subscriber. Fails if one is already installed.
    pub fn init_subscriber(&self) -> anyhow::Result<()> {
        let registry = tracing_subscriber::registry().with(self.env_filter()?);
        match self.format {
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
            LogFormat::Text => registry.with(fmt::layer()).try_init(),
        }
        .context("failed to install tracing subscriber")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let logging: LoggingConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(logging, LoggingConfig::default());
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, LogFormat::Json);
    }

    #[test]
    fn test_text_format() {
        let logging: LoggingConfig = serde_yaml::from_str("level: debug\nformat: text\n").unwrap();
        assert_eq!(logging.format, LogFormat::Text);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(serde_yaml::from_str::<LoggingConfig>("format: xml\n").is_err());
    }
}
