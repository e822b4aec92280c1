//! Configuration loading and management
//!
//! Handles parsing of the optional `config.toml` in the data directory.

use serde::Deserialize;
use std::path::Path;

use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::todo::{Priority, SyncPolicy};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Todo defaults
    #[serde(default)]
    pub todos: TodosConfig,

    /// Storage behavior
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Todo-related configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TodosConfig {
    /// Priority for new todos when none is given
    #[serde(default = "default_priority")]
    pub default_priority: String,
}

fn default_priority() -> String {
    Priority::default().as_str().to_string()
}

impl Default for TodosConfig {
    fn default() -> Self {
        Self {
            default_priority: default_priority(),
        }
    }
}

impl TodosConfig {
    /// Parsed default priority
    pub fn priority(&self) -> crate::error::Result<Priority> {
        self.default_priority.parse().map_err(|_| {
            crate::error::Error::InvalidConfig(format!(
                "todos.default_priority: invalid priority '{}' (expected High|Medium|Low)",
                self.default_priority
            ))
        })
    }
}

/// Storage-related configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// What happens to the in-memory list when a write fails
    #[serde(default = "default_sync_policy")]
    pub sync_policy: String,

    /// How long to wait for the session lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_sync_policy() -> String {
    "strict".to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sync_policy: default_sync_policy(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl StorageConfig {
    /// Parsed sync policy
    pub fn policy(&self) -> crate::error::Result<SyncPolicy> {
        match self.sync_policy.trim() {
            "strict" => Ok(SyncPolicy::Strict),
            "optimistic" => Ok(SyncPolicy::Optimistic),
            other => Err(crate::error::Error::InvalidConfig(format!(
                "storage.sync_policy: invalid policy '{other}' (expected strict|optimistic)"
            ))),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from a data directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(crate::storage::CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.todos.priority()?;
        self.storage.policy()?;
        if self.storage.lock_timeout_ms == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.todos.default_priority, "Medium");
        assert_eq!(cfg.todos.priority().expect("priority"), Priority::Medium);
        assert_eq!(cfg.storage.sync_policy, "strict");
        assert_eq!(cfg.storage.policy().expect("policy"), SyncPolicy::Strict);
        assert_eq!(cfg.storage.lock_timeout_ms, 5000);
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let content = r#"
[todos]
default_priority = "high"

[storage]
sync_policy = "optimistic"
lock_timeout_ms = 250
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.todos.priority().expect("priority"), Priority::High);
        assert_eq!(cfg.storage.policy().expect("policy"), SyncPolicy::Optimistic);
        assert_eq!(cfg.storage.lock_timeout_ms, 250);
    }

    #[test]
    fn invalid_priority_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[todos]\ndefault_priority = \"urgent\"").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            crate::error::Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_lock_timeout_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[storage]\nlock_timeout_ms = 0").expect("write config");

        assert!(matches!(
            Config::load(&path),
            Err(crate::error::Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_from_dir_falls_back_on_invalid_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("config.toml"), "this = [not valid").expect("write config");

        let cfg = Config::load_from_dir(dir.path());
        assert_eq!(cfg.storage.sync_policy, "strict");
    }
}
