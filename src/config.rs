//! Configuration file.
//!
//! Read from `--config <path>` when given, otherwise from
//! `<config dir>/chartops/config.json` when that exists. Missing keys take
//! their defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::datum::FieldMap;
use crate::engine::EngineConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dataset column names for the category, series and measure roles.
    pub fields: FieldMap,
    /// Pause between script stages, in milliseconds.
    pub stage_delay_ms: u64,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fields: FieldMap::default(),
            stage_delay_ms: 0,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// The per-user config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("chartops").join("config.json"))
    }

    /// Load from `path`, or from the default location, or fall back to
    /// defaults. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            stage_delay: Duration::from_millis(self.stage_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(Config::parse("{}").unwrap(), Config::default());
    }

    #[test]
    fn partial_fields() {
        let config = Config::parse(r#"{"fields": {"category": "country"}, "stage_delay_ms": 250}"#).unwrap();
        assert_eq!(config.fields.category, "country");
        assert_eq!(config.fields.measure, "value");
        assert_eq!(config.fields.series.as_deref(), Some("group"));
        assert_eq!(config.engine_config().stage_delay, Duration::from_millis(250));
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn bad_json_is_error() {
        assert!(Config::parse("{").is_err());
        assert!(Config::parse(r#"{"stage_delay_ms": "soon"}"#).is_err());
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/chartops.json"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
