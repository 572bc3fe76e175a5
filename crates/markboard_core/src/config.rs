//! Engine configuration.
//!
//! # Responsibility
//! - Hold the knobs front ends pass into the core: default identity
//!   strategy, log level and database location.
//! - Load them from JSON or from `MARKBOARD_*` environment variables.
//!
//! # Invariants
//! - A validated config has a non-empty `db_path` when one is set.
//! - Unknown JSON fields are rejected.

use crate::logging::LogLevel;
use crate::model::ids::IdentityStrategy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_IDENTITY_STRATEGY: &str = "MARKBOARD_IDENTITY_STRATEGY";
pub const ENV_LOG_LEVEL: &str = "MARKBOARD_LOG_LEVEL";
pub const ENV_DB_PATH: &str = "MARKBOARD_DB_PATH";

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidJson(String),
    UnsupportedStrategy(String),
    UnsupportedLogLevel(String),
    EmptyDbPath,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(message) => write!(f, "invalid config json: {message}"),
            Self::UnsupportedStrategy(value) => {
                write!(f, "unsupported identity strategy `{value}`; expected fresh|embedded")
            }
            Self::UnsupportedLogLevel(value) => write!(f, "unsupported log level `{value}`"),
            Self::EmptyDbPath => write!(f, "db_path cannot be empty"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Strategy for boards created without an explicit one.
    pub identity_strategy: IdentityStrategy,
    pub log_level: LogLevel,
    /// SQLite file; `None` means the front end decides.
    pub db_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identity_strategy: IdentityStrategy::default(),
            log_level: LogLevel::for_build(),
            db_path: None,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON document; missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::InvalidJson(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `MARKBOARD_*` variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_IDENTITY_STRATEGY) {
            config.identity_strategy = value
                .parse()
                .map_err(|_| ConfigError::UnsupportedStrategy(value.trim().to_string()))?;
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            config.log_level = value
                .parse()
                .map_err(|_| ConfigError::UnsupportedLogLevel(value.trim().to_string()))?;
        }
        if let Some(value) = lookup(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(value));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.db_path {
            if path.as_os_str().to_string_lossy().trim().is_empty() {
                return Err(ConfigError::EmptyDbPath);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig, ENV_DB_PATH, ENV_IDENTITY_STRATEGY, ENV_LOG_LEVEL};
    use crate::logging::LogLevel;
    use crate::model::ids::IdentityStrategy;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn empty_json_takes_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.identity_strategy, IdentityStrategy::Fresh);
    }

    #[test]
    fn json_fields_are_read() {
        let config = EngineConfig::from_json_str(
            r#"{"identity_strategy":"embedded","log_level":"warn","db_path":"/tmp/b.sqlite3"}"#,
        )
        .unwrap();
        assert_eq!(config.identity_strategy, IdentityStrategy::Embedded);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/b.sqlite3")));
    }

    #[test]
    fn json_rejects_unknown_fields_and_empty_path() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"theme":"dark"}"#),
            Err(ConfigError::InvalidJson(_))
        ));
        assert_eq!(
            EngineConfig::from_json_str(r#"{"db_path":"  "}"#),
            Err(ConfigError::EmptyDbPath)
        );
    }

    #[test]
    fn lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_IDENTITY_STRATEGY, "Embedded"),
            (ENV_LOG_LEVEL, "error"),
            (ENV_DB_PATH, "/data/boards.sqlite3"),
        ]);
        let config = EngineConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.identity_strategy, IdentityStrategy::Embedded);
        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(config.db_path, Some(PathBuf::from("/data/boards.sqlite3")));
    }

    #[test]
    fn lookup_rejects_bad_values() {
        let err = EngineConfig::from_lookup(|key| {
            (key == ENV_IDENTITY_STRATEGY).then(|| "sticky".to_string())
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedStrategy("sticky".to_string()));
    }

    #[test]
    fn config_serializes_back_to_json() {
        let json = serde_json::to_string(&EngineConfig::default()).unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), EngineConfig::default());
    }
}
