//! Remote API configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Env: SS_API_URL
    pub base_url: String,
    /// Bearer token sent with every request
    /// Env: SS_API_TOKEN
    pub token: Option<String>,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.schemasync.dev/v1".to_string(),
            token: None,
            request_timeout_secs: 30,
        }
    }
}

impl RemoteConfig {
    pub fn merge(&mut self, other: Self) {
        self.base_url = other.base_url;
        self.request_timeout_secs = other.request_timeout_secs;
        if other.token.is_some() {
            self.token = other.token;
        }
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(url) = env::var("SS_API_URL") {
            self.base_url = url;
        }
        if let Ok(token) = env::var("SS_API_TOKEN") {
            self.token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            bail!("Invalid remote.base_url: cannot be empty");
        }
        if self.request_timeout_secs == 0 {
            bail!("Invalid remote.request_timeout_secs: must be greater than 0");
        }
        Ok(())
    }
}
