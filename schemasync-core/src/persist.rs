//! Whole-document JSON persistence for local recovery state
//!
//! Every persisted document (schema file, queue file, sync metadata) is written
//! as a complete pretty-printed JSON file. Writes go to a sibling `.tmp` file
//! first and are renamed over the target so a crash never leaves a torn file.
//! Reads come in two flavours: strict (errors propagate) and lenient (missing
//! or corrupt files degrade to `None`).

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Serialize `value` and replace `path` with it
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    json.push('\n');

    let tmp = tmp_path(path);
    fs::write(&tmp, json.as_bytes())?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read and parse `path`, returning `None` on any failure
///
/// A missing file is silent; an unreadable or unparsable one is logged.
pub fn read_json_lenient<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            log::warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring corrupt file {}: {}", path.display(), e);
            None
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents_and_leaves_no_tmp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/state.json");

        write_json_atomic(&path, &serde_json::json!({"a": 1})).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("nested/state.json.tmp").exists());
        let back: serde_json::Value = read_json_lenient(&path).unwrap();
        assert_eq!(back["a"], 1);
    }

    #[test]
    fn lenient_read_degrades_to_none() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(read_json_lenient::<serde_json::Value>(&missing).is_none());

        let corrupt = dir.path().join("corrupt.json");
        fs::write(&corrupt, "{ not json").unwrap();
        assert!(read_json_lenient::<serde_json::Value>(&corrupt).is_none());
    }
}
