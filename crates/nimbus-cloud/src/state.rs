//! Last-applied state
//!
//! Manages the `.nimbus/state.json` file which records, per collection, the
//! desired entities of the last successful pass. Write-only attributes are
//! compared against it since the API never returns them.

use crate::entity::Entity;
use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".nimbus";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";

/// Applied collections indexed by `resource_type:parent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    pub collections: BTreeMap<String, Vec<Entity>>,
}

impl Default for AppliedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            collections: BTreeMap::new(),
        }
    }
}

impl AppliedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection_key(resource_type: &str, parent: &str) -> String {
        format!("{}:{}", resource_type, parent)
    }

    pub fn get(&self, resource_type: &str, parent: &str) -> Option<&[Entity]> {
        self.collections
            .get(&Self::collection_key(resource_type, parent))
            .map(Vec::as_slice)
    }

    /// Record the desired entities of a successful pass
    pub fn record(&mut self, resource_type: &str, parent: &str, entities: Vec<Entity>) {
        self.collections
            .insert(Self::collection_key(resource_type, parent), entities);
        self.updated_at = Utc::now();
    }
}

/// Reads and writes the state file under a project root
pub struct StateManager {
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    /// Load the state, empty when no file exists yet
    pub async fn load(&self) -> Result<AppliedState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(AppliedState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: AppliedState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::InvalidConfig(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} collections", state.collections.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &AppliedState) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
        }

        let path = self.state_path();
        if path.exists() {
            fs::rename(&path, self.backup_path()).await?;
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} collections", state.collections.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateManager::new(dir.path()).load().await.unwrap();
        assert!(state.collections.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StateManager::new(dir.path());

        let mut state = AppliedState::new();
        state.record("kafka-user", "c1", vec![Entity::new("u1").with("password", "a")]);
        manager.save(&state).await.unwrap();

        state.record("kafka-user", "c1", vec![Entity::new("u1").with("password", "b")]);
        manager.save(&state).await.unwrap();

        let loaded = manager.load().await.unwrap();
        let users = loaded.get("kafka-user", "c1").unwrap();
        assert_eq!(users[0].get_str("password"), Some("b"));
        assert!(loaded.get("kafka-topic", "c1").is_none());
        assert!(dir.path().join(".nimbus/state.json.backup").exists());
    }

    #[tokio::test]
    async fn test_newer_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StateManager::new(dir.path());
        let state = AppliedState {
            version: STATE_VERSION + 1,
            ..AppliedState::new()
        };
        manager.save(&state).await.unwrap();

        assert!(manager.load().await.is_err());
    }
}
