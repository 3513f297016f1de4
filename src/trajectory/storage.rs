//! Storage for trajectory data.
//!
//! Local file-based sink for finished trajectories, so runs can be reloaded
//! for later analysis.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::atif::AtifDocument;
use super::types::Trajectory;

/// Errors that can occur during trajectory storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to read or write to the filesystem.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize trajectory data.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Trajectory with the specified ID was not found.
    #[error("Trajectory not found: {0}")]
    NotFound(Uuid),

    /// The storage directory could not be created.
    #[error("Failed to create storage directory: {0}")]
    DirectoryCreationFailed(String),

    /// The trajectory file is corrupted or invalid.
    #[error("Invalid trajectory data: {0}")]
    InvalidData(String),
}

/// Local file storage for trajectories.
///
/// Trajectories are stored as `{id}.json`; ATIF exports as `{id}.atif.json`.
pub struct TrajectoryStorage {
    base_path: PathBuf,
}

impl TrajectoryStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    async fn ensure_directory(&self) -> Result<(), StorageError> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path).await.map_err(|e| {
                StorageError::DirectoryCreationFailed(format!(
                    "Failed to create directory {:?}: {}",
                    self.base_path, e
                ))
            })?;
        }
        Ok(())
    }

    async fn write_json(&self, path: &Path, json: String) -> Result<(), StorageError> {
        let mut file = fs::File::create(path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Saves a trajectory and returns the path it was written to.
    pub async fn save(&self, trajectory: &Trajectory) -> Result<PathBuf, StorageError> {
        self.ensure_directory().await?;

        let path = self.trajectory_path(&trajectory.id());
        let json = serde_json::to_string_pretty(trajectory)?;
        self.write_json(&path, json).await?;

        Ok(path)
    }

    /// Writes the ATIF rendering of a trajectory next to the native file.
    pub async fn save_atif(&self, trajectory: &Trajectory) -> Result<PathBuf, StorageError> {
        self.ensure_directory().await?;

        let path = self.atif_path(&trajectory.id());
        let json = serde_json::to_string_pretty(&AtifDocument::from_trajectory(trajectory))?;
        self.write_json(&path, json).await?;

        Ok(path)
    }

    /// Loads a trajectory by id.
    pub async fn load(&self, id: &Uuid) -> Result<Trajectory, StorageError> {
        let path = self.trajectory_path(id);

        if !path.exists() {
            return Err(StorageError::NotFound(*id));
        }

        let trajectory = load_file(&path).await?;

        if trajectory.id() != *id {
            return Err(StorageError::InvalidData(format!(
                "Trajectory ID mismatch: expected {}, got {}",
                id,
                trajectory.id()
            )));
        }

        Ok(trajectory)
    }

    /// Lists stored trajectory ids, sorted.
    pub async fn list(&self) -> Result<Vec<Uuid>, StorageError> {
        self.ensure_directory().await?;

        let mut trajectories = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            // ATIF files have a `{id}.atif` stem and are skipped here.
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = Uuid::parse_str(stem) {
                    trajectories.push(id);
                }
            }
        }

        trajectories.sort();

        Ok(trajectories)
    }

    pub fn trajectory_path(&self, id: &Uuid) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }

    pub fn atif_path(&self, id: &Uuid) -> PathBuf {
        self.base_path.join(format!("{}.atif.json", id))
    }

    /// Deletes a trajectory and its ATIF export, if any.
    pub async fn delete(&self, id: &Uuid) -> Result<(), StorageError> {
        let path = self.trajectory_path(id);

        if !path.exists() {
            return Err(StorageError::NotFound(*id));
        }

        fs::remove_file(&path).await?;
        let atif = self.atif_path(id);
        if atif.exists() {
            fs::remove_file(&atif).await?;
        }
        Ok(())
    }

    pub fn exists(&self, id: &Uuid) -> bool {
        self.trajectory_path(id).exists()
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}

/// Reads a trajectory file from an arbitrary path.
pub async fn load_file(path: &Path) -> Result<Trajectory, StorageError> {
    let contents = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::recorder::TrajectoryRecorder;
    use crate::trajectory::types::{ConfigSnapshot, TerminationReason};
    use tempfile::TempDir;

    fn create_test_trajectory() -> Trajectory {
        let mut recorder = TrajectoryRecorder::new(ConfigSnapshot {
            max_turns: 3,
            user_timeout_ms: None,
            agent_timeout_ms: None,
            simulated_user: "scripted-user".to_string(),
            inner_agent: "echo".to_string(),
        });
        recorder.record_user(1, "step 1");
        recorder.record_agent(1, "ack 1");
        recorder.finalize(TerminationReason::MaxTurnsReached { limit: 1 })
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = TrajectoryStorage::new(temp_dir.path());

        let trajectory = create_test_trajectory();
        let id = trajectory.id();

        let saved_path = storage
            .save(&trajectory)
            .await
            .expect("Save should succeed");
        assert!(saved_path.exists());

        let loaded = storage.load(&id).await.expect("Load should succeed");
        assert_eq!(loaded, trajectory);
    }

    #[tokio::test]
    async fn test_load_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = TrajectoryStorage::new(temp_dir.path());

        let result = storage.load(&Uuid::new_v4()).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_skips_atif_exports() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = TrajectoryStorage::new(temp_dir.path());

        let mut ids = Vec::new();
        for _ in 0..3 {
            let trajectory = create_test_trajectory();
            ids.push(trajectory.id());
            storage.save(&trajectory).await.expect("Save should succeed");
            storage
                .save_atif(&trajectory)
                .await
                .expect("ATIF save should succeed");
        }

        let listed = storage.list().await.expect("List should succeed");
        assert_eq!(listed.len(), 3);
        for id in ids {
            assert!(listed.contains(&id));
        }
    }

    #[tokio::test]
    async fn test_delete_removes_both_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = TrajectoryStorage::new(temp_dir.path());

        let trajectory = create_test_trajectory();
        let id = trajectory.id();
        storage.save(&trajectory).await.expect("Save should succeed");
        storage.save_atif(&trajectory).await.expect("ATIF save should succeed");
        assert!(storage.exists(&id));

        storage.delete(&id).await.expect("Delete should succeed");
        assert!(!storage.exists(&id));
        assert!(!storage.atif_path(&id).exists());

        let again = storage.delete(&id).await;
        assert!(matches!(again, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let nested_path = temp_dir.path().join("nested").join("path");
        assert!(!nested_path.exists());

        let storage = TrajectoryStorage::new(&nested_path);
        storage
            .save(&create_test_trajectory())
            .await
            .expect("Save should succeed");

        assert!(nested_path.exists());
    }

    #[tokio::test]
    async fn test_load_file_from_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = TrajectoryStorage::new(temp_dir.path());
        let trajectory = create_test_trajectory();
        let path = storage.save(&trajectory).await.expect("Save should succeed");

        let loaded = load_file(&path).await.expect("load_file should succeed");
        assert_eq!(loaded.id(), trajectory.id());
        assert_eq!(loaded.messages().len(), 2);
    }
}
