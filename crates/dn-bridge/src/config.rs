//! Bridge configuration: TOML file plus environment overrides

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Names a TOML config file
pub const CONFIG_ENV: &str = "DN_BRIDGE_CONFIG";
/// Overrides `log_filter`
pub const LOG_ENV: &str = "DN_BRIDGE_LOG";
/// Overrides `model_path`
pub const MODEL_ENV: &str = "DN_BRIDGE_MODEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Process-wide bridge settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// env_logger filter directives
    pub log_filter: String,

    /// Weights used by `create_default_denoiser`; built-in model when unset
    pub model_path: Option<PathBuf>,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            model_path: None,
        }
    }
}

impl BridgeConfig {
    /// Parse from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Resolve from the process environment.
    ///
    /// A broken config file is reported and defaults are used instead.
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` for variables
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)).unwrap_or_else(|err| {
                // Logging may not be installed yet
                eprintln!("dn-bridge: {}; using defaults", err);
                Self::default()
            }),
            None => Self::default(),
        };
        config.apply_overrides(lookup);
        config
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(filter) = lookup(LOG_ENV).filter(|s| !s.trim().is_empty()) {
            self.log_filter = filter;
        }
        if let Some(path) = lookup(MODEL_ENV).filter(|s| !s.trim().is_empty()) {
            self.model_path = Some(PathBuf::from(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::resolve(env(&[]));
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.log_filter, "warn");
        assert!(config.model_path.is_none());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = BridgeConfig {
            log_filter: "dn_bridge=debug".to_string(),
            model_path: Some(PathBuf::from("/opt/models/voice.rnn")),
        };
        let toml = config.to_toml().unwrap();
        assert_eq!(BridgeConfig::from_toml(&toml).unwrap(), config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = BridgeConfig::from_toml("model_path = \"weights.rnn\"").unwrap();
        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.model_path, Some(PathBuf::from("weights.rnn")));
    }

    #[test]
    fn test_env_overrides() {
        let config = BridgeConfig::resolve(env(&[(LOG_ENV, "debug"), (MODEL_ENV, "/tmp/m.rnn")]));
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.model_path, Some(PathBuf::from("/tmp/m.rnn")));
    }

    #[test]
    fn test_blank_overrides_ignored() {
        let config = BridgeConfig::resolve(env(&[(LOG_ENV, "  "), (MODEL_ENV, "")]));
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = BridgeConfig::resolve(env(&[(CONFIG_ENV, "/nonexistent/dn-bridge.toml")]));
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_file_then_env() {
        let path = std::env::temp_dir().join(format!("dn-bridge-config-{}.toml", std::process::id()));
        std::fs::write(&path, "log_filter = \"info\"\nmodel_path = \"from-file.rnn\"\n").unwrap();

        let config = BridgeConfig::resolve(env(&[
            (CONFIG_ENV, path.to_str().unwrap()),
            (MODEL_ENV, "from-env.rnn"),
        ]));
        std::fs::remove_file(&path).ok();

        assert_eq!(config.log_filter, "info");
        assert_eq!(config.model_path, Some(PathBuf::from("from-env.rnn")));
    }

    #[test]
    fn test_bad_toml_is_error() {
        assert!(matches!(
            BridgeConfig::from_toml("log_filter = ["),
            Err(ConfigError::Parse(_))
        ));
    }
}
