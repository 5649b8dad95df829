//! Local file-based state storage backend.
//!
//! State lives in a JSON file next to the manifest. Writes go through a
//! temporary file and a rename so a crash never leaves a half-written state.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::lock::{LOCK_EXPIRY_SECS, LockInfo, generate_holder_id};
use super::store::StateStore;
use super::types::{ProviderState, STATE_VERSION};
use crate::error::{Result, StateError, SwitchcloudError};

/// Default state directory name.
pub const STATE_DIR: &str = ".switchcloud";

/// State file name.
const STATE_FILE: &str = "state.json";

/// Lock file name.
const LOCK_FILE: &str = "state.lock";

/// Local file-based state store.
#[derive(Debug)]
pub struct LocalStateStore {
    /// Base directory for state files.
    base_dir: PathBuf,
    /// Path to the state file.
    state_path: PathBuf,
    /// Path to the lock file.
    lock_path: PathBuf,
}

impl LocalStateStore {
    /// Creates a state store under `.switchcloud` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn new() -> Result<Self> {
        let base_dir = std::env::current_dir()
            .map_err(|e| {
                SwitchcloudError::internal(format!("Cannot determine current directory: {e}"))
            })?
            .join(STATE_DIR);

        Ok(Self::with_base_dir(base_dir))
    }

    /// Creates a state store with a custom base directory.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let state_path = base_dir.join(STATE_FILE);
        let lock_path = base_dir.join(LOCK_FILE);

        Self {
            base_dir,
            state_path,
            lock_path,
        }
    }

    /// Returns the path of the state file.
    #[must_use]
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    async fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            debug!("Creating state directory: {}", self.base_dir.display());
            fs::create_dir_all(&self.base_dir).await?;
        }
        Ok(())
    }

    /// Writes `content` to `path` through a temporary file and a rename.
    async fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        self.ensure_dir().await?;

        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, path).await?;
        Ok(())
    }

    async fn read_lock_file(&self) -> Result<Option<LockInfo>> {
        if !self.lock_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.lock_path).await.map_err(|e| {
            SwitchcloudError::State(StateError::Corrupted {
                message: format!("Failed to read lock file: {e}"),
            })
        })?;

        let lock_info: LockInfo = serde_json::from_str(&content).map_err(|e| {
            SwitchcloudError::State(StateError::Corrupted {
                message: format!("Failed to parse lock file: {e}"),
            })
        })?;

        Ok(Some(lock_info))
    }

    async fn delete_lock_file(&self) -> Result<()> {
        if self.lock_path.exists() {
            fs::remove_file(&self.lock_path).await.map_err(|e| {
                SwitchcloudError::State(StateError::LockFailed {
                    message: format!("Failed to delete lock file: {e}"),
                })
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self) -> Result<Option<ProviderState>> {
        if !self.state_path.exists() {
            debug!("State file does not exist: {}", self.state_path.display());
            return Ok(None);
        }

        info!("Loading state from: {}", self.state_path.display());

        let content = fs::read_to_string(&self.state_path).await.map_err(|e| {
            SwitchcloudError::State(StateError::Corrupted {
                message: format!("Failed to read state file: {e}"),
            })
        })?;

        let state: ProviderState = serde_json::from_str(&content).map_err(|e| {
            SwitchcloudError::State(StateError::Corrupted {
                message: format!("Failed to parse state file: {e}"),
            })
        })?;

        if state.version != STATE_VERSION {
            return Err(SwitchcloudError::State(StateError::VersionMismatch {
                expected: STATE_VERSION.to_string(),
                found: state.version,
            }));
        }

        Ok(Some(state))
    }

    async fn save(&self, state: &ProviderState) -> Result<()> {
        info!("Saving state to: {}", self.state_path.display());

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::serialization(format!("Failed to serialize state: {e}")))?;
        self.write_atomic(&self.state_path, &content).await?;

        debug!("State saved successfully");
        Ok(())
    }

    async fn acquire_lock(&self, holder: &str, operation: &str) -> Result<LockInfo> {
        if let Some(existing) = self.read_lock_file().await? {
            if !existing.is_expired() {
                return Err(SwitchcloudError::State(StateError::LockedByOther {
                    holder: existing.holder,
                    since: existing.acquired_at.to_rfc3339(),
                }));
            }
            warn!("Taking over expired lock held by {}", existing.holder);
        }

        let holder_id = if holder.is_empty() {
            generate_holder_id()
        } else {
            holder.to_string()
        };

        let lock_info = LockInfo::new(&holder_id).with_operation(operation);
        let content = serde_json::to_string_pretty(&lock_info)
            .map_err(|e| StateError::serialization(format!("Failed to serialize lock: {e}")))?;
        self.write_atomic(&self.lock_path, &content)
            .await
            .map_err(|e| {
                SwitchcloudError::State(StateError::LockFailed {
                    message: e.to_string(),
                })
            })?;

        info!(
            "Acquired state lock: {} (expires in {}s)",
            lock_info.lock_id, LOCK_EXPIRY_SECS
        );

        Ok(lock_info)
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        if let Some(existing) = self.read_lock_file().await? {
            if existing.lock_id == lock_id {
                self.delete_lock_file().await?;
                info!("Released state lock: {lock_id}");
            } else {
                debug!(
                    "Lock ID mismatch: expected {lock_id}, found {}",
                    existing.lock_id
                );
            }
        }
        Ok(())
    }

    async fn force_unlock(&self) -> Result<()> {
        if let Some(existing) = self.read_lock_file().await? {
            warn!("Force-releasing lock held by {}", existing.holder);
        }
        self.delete_lock_file().await
    }

    async fn get_lock_info(&self) -> Result<Option<LockInfo>> {
        self.read_lock_file().await
    }

    fn location(&self) -> String {
        self.state_path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Object, ResourceAddress};
    use tempfile::TempDir;

    fn create_test_store() -> (LocalStateStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp_dir.path().join(STATE_DIR));
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _temp) = create_test_store();

        let mut state = ProviderState::new("https://api.switchcloud.com");
        state.record(
            &ResourceAddress::project("platform"),
            Object::new().with("id", "p1").with("name", "Platform"),
        );
        store.save(&state).await.expect("Failed to save state");

        let loaded = store
            .load()
            .await
            .expect("Failed to load state")
            .expect("State should exist");

        assert_eq!(loaded.resources, state.resources);
        assert!(!store.state_path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _temp) = create_test_store();

        let result = store.load().await.expect("Load should not fail");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let (store, _temp) = create_test_store();

        let mut state = ProviderState::new("https://api.switchcloud.com");
        state.version = "0".to_string();
        store.save(&state).await.expect("Failed to save state");

        let err = store.load().await.expect_err("Old state should be rejected");
        assert!(matches!(
            err,
            SwitchcloudError::State(StateError::VersionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_lock_acquire_release() {
        let (store, _temp) = create_test_store();

        let lock = store
            .acquire_lock("test-holder", "apply")
            .await
            .expect("Failed to acquire lock");
        assert_eq!(lock.operation.as_deref(), Some("apply"));

        let result = store.acquire_lock("other-holder", "apply").await;
        assert!(matches!(
            result,
            Err(SwitchcloudError::State(StateError::LockedByOther { .. }))
        ));

        store
            .release_lock(&lock.lock_id)
            .await
            .expect("Failed to release lock");

        assert!(store.get_lock_info().await.expect("lock info").is_none());
    }

    #[tokio::test]
    async fn test_force_unlock() {
        let (store, _temp) = create_test_store();

        store.acquire_lock("", "lock").await.expect("Failed to acquire lock");
        store.force_unlock().await.expect("Failed to force unlock");

        assert!(store.get_lock_info().await.expect("lock info").is_none());
    }
}
