//! Network probe configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Network monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// URL probed with a HEAD request
    /// Env: SS_NETWORK_ENDPOINT
    /// Default: "https://api.schemasync.dev/health"
    pub endpoint: String,

    /// Probe timeout in milliseconds
    /// Env: SS_NETWORK_TIMEOUT_MS
    /// Default: 5000
    pub timeout_ms: u64,

    /// How long a probe verdict stays valid, in seconds
    /// Env: SS_NETWORK_CACHE_TTL
    /// Default: 30
    pub cache_ttl_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.schemasync.dev/health".to_string(),
            timeout_ms: 5_000,
            cache_ttl_secs: 30,
        }
    }
}

impl NetworkConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.endpoint = other.endpoint;
        self.timeout_ms = other.timeout_ms;
        self.cache_ttl_secs = other.cache_ttl_secs;
    }

    /// Apply environment variables
    pub fn apply_env_vars(&mut self) {
        if let Ok(endpoint) = env::var("SS_NETWORK_ENDPOINT") {
            self.endpoint = endpoint;
        }

        if let Ok(timeout) = env::var("SS_NETWORK_TIMEOUT_MS") {
            if let Ok(t) = timeout.parse() {
                self.timeout_ms = t;
            }
        }

        if let Ok(ttl) = env::var("SS_NETWORK_CACHE_TTL") {
            if let Ok(t) = ttl.parse() {
                self.cache_ttl_secs = t;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            bail!("Invalid network.endpoint: cannot be empty");
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            bail!("Invalid network.endpoint: must be an http(s) URL, got {}", self.endpoint);
        }
        if self.timeout_ms == 0 {
            bail!("Invalid network.timeout_ms: must be greater than 0");
        }
        Ok(())
    }
}
