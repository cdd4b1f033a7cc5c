//! Host-owned configuration stores.
//!
//! The only value this crate ever writes back is the project id resolved from
//! a project name, so later runs skip the name lookup.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::config::{ConfigError, ConfigFile};

/// Errors persisting configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has no entry with this id
    #[error("Unknown config entry '{0}'")]
    UnknownEntry(String),

    /// Reading or writing the backing file failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The blocking file task did not complete
    #[error("Config file task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Where resolved project ids are written back to.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Record the resolved project id for an entry.
    async fn persist_project_id(&self, entry_id: &str, project_id: &str)
        -> Result<(), StoreError>;
}

/// Store that keeps resolved ids in memory only.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    project_ids: RwLock<HashMap<String, String>>,
}

impl MemoryConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Project id recorded for an entry, if any.
    pub async fn project_id(&self, entry_id: &str) -> Option<String> {
        self.project_ids.read().await.get(entry_id).cloned()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn persist_project_id(
        &self,
        entry_id: &str,
        project_id: &str,
    ) -> Result<(), StoreError> {
        self.project_ids
            .write()
            .await
            .insert(entry_id.to_string(), project_id.to_string());
        Ok(())
    }
}

/// Store backed by the TOML config file the entries were loaded from.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl FileConfigStore {
    /// Create a store writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn persist_project_id(
        &self,
        entry_id: &str,
        project_id: &str,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let path = self.path.clone();
        let entry_id_owned = entry_id.to_string();
        let project_id_owned = project_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut file = ConfigFile::load(&path)?;
            let entry = file
                .entry_mut(&entry_id_owned)
                .ok_or_else(|| StoreError::UnknownEntry(entry_id_owned.clone()))?;
            entry.project_id = Some(project_id_owned);
            file.save(&path)?;
            Ok(())
        })
        .await??;

        debug!(entry_id, project_id, path = %self.path.display(), "Persisted resolved project id");
        Ok(())
    }
}
