use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_KEY_VAR: &str = "REMINDER_BRIDGE_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which host subsystem the store talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Eventkit,
    Memory,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Backend::Eventkit
        } else {
            Backend::Memory
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub request_access_on_startup: bool,
    pub bridge_timeout_secs: Option<u64>,
    pub log_filter: String,
    pub api_key: Option<String>,
    /// Evaluation zone of the in-memory backend.
    pub time_zone: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            request_access_on_startup: true,
            bridge_timeout_secs: None,
            log_filter: "info".to_string(),
            api_key: None,
            time_zone: None,
        }
    }
}

impl Config {
    /// Load the user config, falling back to defaults when there is none, and
    /// apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        Ok(config.with_env(|name| std::env::var(name).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    /// Overlay values taken from the environment through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_VAR).filter(|key| !key.is_empty()) {
            self.api_key = Some(key);
        }
        if self.time_zone.is_none() {
            self.time_zone = lookup("TZ").filter(|tz| !tz.is_empty());
        }
        self
    }

    pub fn bridge_timeout(&self) -> Option<Duration> {
        self.bridge_timeout_secs.map(Duration::from_secs)
    }

    pub fn memory_time_zone(&self) -> String {
        self.time_zone.clone().unwrap_or_else(|| "UTC".to_string())
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("reminder-bridge").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_request_access_without_timeout() {
        let config = Config::default();
        assert!(config.request_access_on_startup);
        assert_eq!(config.bridge_timeout(), None);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn parse_partial_toml() {
        let config = Config::from_toml(
            r#"
backend = "memory"
bridge_timeout_secs = 30
time_zone = "Europe/Paris"
"#,
        )
        .unwrap();

        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.bridge_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.memory_time_zone(), "Europe/Paris");
        assert!(config.request_access_on_startup);
    }

    #[test]
    fn unknown_backend_is_a_parse_error() {
        let err = Config::from_toml(r#"backend = "carrier-pigeon""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn environment_api_key_wins() {
        let config = Config {
            api_key: Some("from-file".into()),
            ..Config::default()
        }
        .with_env(|name| (name == API_KEY_VAR).then(|| "from-env".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn tz_only_fills_a_missing_zone() {
        let lookup = |name: &str| (name == "TZ").then(|| "Asia/Tokyo".to_string());

        let config = Config::default().with_env(lookup);
        assert_eq!(config.memory_time_zone(), "Asia/Tokyo");

        let config = Config {
            time_zone: Some("Europe/Oslo".into()),
            ..Config::default()
        }
        .with_env(lookup);
        assert_eq!(config.memory_time_zone(), "Europe/Oslo");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "request_access_on_startup = false").unwrap();
        writeln!(file, "log_filter = \"reminder_bridge=debug\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert!(!config.request_access_on_startup);
        assert_eq!(config.log_filter, "reminder_bridge=debug");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
