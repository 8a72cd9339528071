//! Offline queue configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue file name, relative to the project state directory
    pub file_name: String,
    /// Env: SS_QUEUE_MAX_SIZE
    pub max_size: usize,
    /// Failed replays before an operation is evicted
    /// Env: SS_QUEUE_MAX_RETRIES
    pub max_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { file_name: "queue.json".to_string(), max_size: 50, max_retries: 3 }
    }
}

impl QueueConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(size) = env::var("SS_QUEUE_MAX_SIZE") {
            if let Ok(s) = size.parse() {
                self.max_size = s;
            }
        }
        if let Ok(retries) = env::var("SS_QUEUE_MAX_RETRIES") {
            if let Ok(r) = retries.parse() {
                self.max_retries = r;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            bail!("Invalid queue.max_size: must be at least 1");
        }
        if self.max_retries == 0 {
            bail!("Invalid queue.max_retries: must be at least 1");
        }
        if self.file_name.trim().is_empty() {
            bail!("Invalid queue.file_name: cannot be empty");
        }
        Ok(())
    }
}
