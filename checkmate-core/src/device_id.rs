//! Persistent identity for this machine, stored in
//! `~/.llm_checkmate/device.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::AgentError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeviceFile {
    device_id: String,
    #[serde(default)]
    created_at: Option<String>,
}

pub fn default_path() -> PathBuf {
    Settings::home_dir().join("device.json")
}

fn read_existing(path: &Path) -> Result<Option<String>, AgentError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let file: DeviceFile = serde_json::from_str(&content)?;
    Ok(Some(file.device_id).filter(|id| !id.trim().is_empty()))
}

fn persist(path: &Path, device_id: &str) -> Result<(), AgentError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = DeviceFile {
        device_id: device_id.to_string(),
        created_at: Some(chrono::Utc::now().to_rfc3339()),
    };
    std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}

/// Return the stored id, or create and store a new UUID. A corrupt file is
/// replaced. If the new id cannot be written it is still returned, so the
/// current run can proceed.
pub fn get_or_create_at(path: &Path) -> String {
    match read_existing(path) {
        Ok(Some(id)) => return id,
        Ok(None) => {}
        Err(e) => warn!(path = %path.display(), error = %e, "corrupt device file, regenerating id"),
    }

    let id = Uuid::new_v4().to_string();
    if let Err(e) = persist(path, &id) {
        error!(path = %path.display(), error = %e, "failed to persist device id");
    }
    id
}

pub fn get_or_create() -> String {
    get_or_create_at(&default_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_and_reuses_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("device.json");

        let first = get_or_create_at(&path);
        assert!(Uuid::parse_str(&first).is_ok());
        assert!(path.exists());

        let second = get_or_create_at(&path);
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_file_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("device.json");
        std::fs::write(&path, "{not json").unwrap();

        let id = get_or_create_at(&path);
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(get_or_create_at(&path), id);
    }

    #[test]
    fn test_reads_file_written_by_older_agent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("device.json");
        std::fs::write(
            &path,
            r#"{"device_id": "legacy-id", "created_at": "2024-05-01 10:00:00.123456"}"#,
        )
        .unwrap();
        assert_eq!(get_or_create_at(&path), "legacy-id");
    }

    #[test]
    fn test_unwritable_location_still_returns_id() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // parent is a regular file, so create_dir_all fails
        let id = get_or_create_at(&blocker.join("device.json"));
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
