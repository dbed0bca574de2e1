//! Runtime configuration for hosts embedding the core.
//!
//! Values come from environment variables (`TOPSY_*`) or a JSON document.
//! Anything not provided falls back to [`CoreConfig::default`].

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_STORAGE: &str = "TOPSY_STORAGE";
pub const ENV_DB_PATH: &str = "TOPSY_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TOPSY_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TOPSY_LOG_DIR";

/// Storage backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    #[default]
    Memory,
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub storage: StorageConfig,
    pub log_level: String,
    /// File logging is disabled when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    UnknownBackend(String),
    MissingDbPath,
    InvalidJson(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownBackend(value) => {
                write!(f, "unknown storage backend `{value}`; expected memory|sqlite")
            }
            Self::MissingDbPath => write!(f, "sqlite storage requires {ENV_DB_PATH}"),
            Self::InvalidJson(err) => write!(f, "invalid config document: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidJson(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidJson(value)
    }
}

impl CoreConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(ENV_DB_PATH).map(PathBuf::from);
        let backend = read(ENV_STORAGE).map(|value| value.to_ascii_lowercase());
        let storage = match (backend.as_deref(), db_path) {
            (None | Some("sqlite"), Some(path)) => StorageConfig::Sqlite { path },
            (Some("sqlite"), None) => return Err(ConfigError::MissingDbPath),
            (None | Some("memory"), _) => StorageConfig::Memory,
            (Some(other), _) => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        Ok(Self {
            storage,
            log_level: read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        })
    }

    /// Parses a JSON document; omitted keys keep their defaults.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, StorageConfig};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_memory_storage() {
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn sqlite_backend_reads_path() {
        let config = CoreConfig::from_lookup(lookup(&[
            ("TOPSY_STORAGE", "SQLite"),
            ("TOPSY_DB_PATH", "/tmp/topsy.db"),
            ("TOPSY_LOG_LEVEL", "warn"),
        ]))
        .unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Sqlite {
                path: PathBuf::from("/tmp/topsy.db")
            }
        );
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn db_path_alone_selects_sqlite() {
        let config = CoreConfig::from_lookup(lookup(&[("TOPSY_DB_PATH", "/tmp/a.db")])).unwrap();
        assert!(matches!(config.storage, StorageConfig::Sqlite { .. }));
    }

    #[test]
    fn sqlite_without_path_is_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[("TOPSY_STORAGE", "sqlite")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDbPath));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[("TOPSY_STORAGE", "postgres")])).unwrap_err();
        assert!(err.to_string().contains("postgres"));
    }

    #[test]
    fn json_document_fills_defaults() {
        let config = CoreConfig::from_json_str(
            r#"{"storage": {"backend": "sqlite", "path": "/var/lib/topsy.db"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Sqlite {
                path: PathBuf::from("/var/lib/topsy.db")
            }
        );
        assert_eq!(config.log_dir, None);

        assert!(CoreConfig::from_json_str("{").is_err());
    }
}
