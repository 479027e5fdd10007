//! JSON snapshot persistence for the activation store.

use crate::error::StoreError;
use crate::types::Session;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// On-disk copy of every session, rewritten after each mutation.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all sessions atomically using temp file + rename.
    pub async fn save(&self, sessions: &HashMap<String, Session>) -> Result<(), StoreError> {
        let data = serde_json::to_vec(sessions)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!(
            "Saved snapshot ({} sessions, {} bytes) to {:?}",
            sessions.len(),
            data.len(),
            self.path
        );
        Ok(())
    }

    /// Load sessions from disk.
    ///
    /// Returns an empty map if the file doesn't exist.
    pub async fn load(&self) -> Result<HashMap<String, Session>, StoreError> {
        if !self.path.exists() {
            info!(
                "Snapshot not found at {:?}, starting with empty store",
                self.path
            );
            return Ok(HashMap::new());
        }

        let data = fs::read(&self.path).await?;
        if data.is_empty() {
            warn!("Snapshot file is empty, starting with empty store");
            return Ok(HashMap::new());
        }

        let sessions: HashMap<String, Session> = serde_json::from_slice(&data)?;
        info!("Loaded {} sessions from {:?}", sessions.len(), self.path);
        Ok(sessions)
    }
}
