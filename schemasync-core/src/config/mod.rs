//! Configuration system for Schemasync
//!
//! Configuration values are resolved in the following order (highest priority wins):
//!
//! 1. **Environment Variables** (`SS_*`)
//! 2. **Config File** (`schemasync.toml`)
//! 3. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use schemasync_core::config::SyncConfig;
//!
//! let config = SyncConfig::load()?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod logging;
pub mod network;
pub mod project;
pub mod queue;
pub mod remote;

pub use logging::LoggingConfig;
pub use network::NetworkConfig;
pub use project::ProjectConfig;
pub use queue::QueueConfig;
pub use remote::RemoteConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "schemasync.toml";

/// Complete Schemasync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub project: ProjectConfig,
    pub network: NetworkConfig,
    pub queue: QueueConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

impl SyncConfig {
    /// Load configuration with full supersedence chain
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific file (defaults if it does not exist)
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.project.merge(other.project);
        self.network.merge(other.network);
        self.queue.merge(other.queue);
        self.remote.merge(other.remote);
        self.logging.merge(other.logging);
    }

    /// Apply environment variables to configuration
    pub fn apply_env_vars(&mut self) {
        self.project.apply_env_vars();
        self.network.apply_env_vars();
        self.queue.apply_env_vars();
        self.remote.apply_env_vars();
        self.logging.apply_env_vars();
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.project.validate()?;
        self.network.validate()?;
        self.queue.validate()?;
        self.remote.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.queue.max_size, 50);
        assert_eq!(config.queue.max_retries, 3);
        assert_eq!(config.network.cache_ttl_secs, 30);
        assert_eq!(config.project.metadata_path(), Path::new(".schemasync/sync.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "[queue]\nmax_size = 10\n\n[project]\nservice_id = \"svc_123\"\n",
        )
        .unwrap();

        let config = SyncConfig::from_file(&path).unwrap();
        assert_eq!(config.queue.max_size, 10);
        assert_eq!(config.queue.max_retries, 3);
        assert_eq!(config.project.service_id.as_deref(), Some("svc_123"));
        assert_eq!(config.network.timeout_ms, 5_000);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = SyncConfig::default();
        config.network.endpoint = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.queue.max_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[queue\nmax_size = ").unwrap();

        let err = SyncConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }
}
