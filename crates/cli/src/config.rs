//! Runtime settings for the `peercrypt` binary, read from the environment.
//!
//! Only logging is configurable. Salts, iteration counts and the associated
//! data are part of the wire contract and live in code.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated CLI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `json` or `text`.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

fn default_log_level() -> String {
    "warn".into()
}
fn default_log_format() -> LogFormat {
    LogFormat::Json
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(config::Environment::default())
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let cfg = config::Config::builder()
            .add_source(source)
            .build()
            .context("failed to build peercrypt configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise peercrypt configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            anyhow::bail!("LOG_LEVEL must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn defaults() {
        let cfg = Config::from_source(env(&[])).unwrap();
        assert_eq!(cfg.log_level, "warn");
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn reads_log_settings() {
        let cfg = Config::from_source(env(&[("LOG_LEVEL", "debug"), ("LOG_FORMAT", "text")]))
            .unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.log_format, LogFormat::Text);
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Config::from_source(env(&[("LOG_FORMAT", "xml")])).is_err());
    }

    #[test]
    fn validate_rejects_blank_log_level() {
        let cfg = Config {
            log_level: "  ".into(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_accepts_default() {
        assert!(Config::default().validate().is_ok());
    }
}
