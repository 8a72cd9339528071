//! Project layout configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Where the local schema and sync state live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Local schema document
    /// Env: SS_SCHEMA_PATH
    /// Default: "schema.json"
    pub schema_path: PathBuf,

    /// Directory holding the queue file and sync metadata
    /// Env: SS_STATE_DIR
    /// Default: ".schemasync"
    pub state_dir: PathBuf,

    /// Remote service the schema is synchronized with
    /// Env: SS_SERVICE_ID
    pub service_id: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            schema_path: PathBuf::from("schema.json"),
            state_dir: PathBuf::from(".schemasync"),
            service_id: None,
        }
    }
}

impl ProjectConfig {
    pub fn merge(&mut self, other: Self) {
        self.schema_path = other.schema_path;
        self.state_dir = other.state_dir;
        if other.service_id.is_some() {
            self.service_id = other.service_id;
        }
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(path) = env::var("SS_SCHEMA_PATH") {
            self.schema_path = PathBuf::from(path);
        }
        if let Ok(dir) = env::var("SS_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
        if let Ok(id) = env::var("SS_SERVICE_ID") {
            self.service_id = Some(id);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_path.as_os_str().is_empty() {
            bail!("Invalid project.schema_path: cannot be empty");
        }
        if let Some(id) = &self.service_id {
            if id.trim().is_empty() {
                bail!("Invalid project.service_id: cannot be blank");
            }
        }
        Ok(())
    }

    /// Sync metadata file inside the state directory
    pub fn metadata_path(&self) -> PathBuf {
        self.state_dir.join("sync.json")
    }

    /// Queue file inside the state directory
    pub fn queue_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.state_dir.join(file_name)
    }
}
