//! Coordinator registry keyed by config entry id.
//!
//! One coordinator per configured project. The registry is an ordinary value
//! owned by the host and passed to whoever needs a coordinator.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::client::{ClientError, TodoistApi, TodoistClient};
use crate::config::{ConfigError, EntryConfig};
use crate::coordinator::Coordinator;
use crate::error::RefreshError;
use crate::store::ConfigStore;

/// Builds the API implementation for an entry.
pub type ApiFactory =
    Arc<dyn Fn(&EntryConfig) -> Result<Arc<dyn TodoistApi>, ClientError> + Send + Sync>;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Entry failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// HTTP client could not be built
    #[error("Failed to create Todoist client: {0}")]
    Client(#[from] ClientError),

    /// An entry with this id is already running
    #[error("Entry '{0}' is already set up")]
    AlreadySetUp(String),

    /// No entry with this id is running
    #[error("Entry '{0}' is not set up")]
    UnknownEntry(String),

    /// The initial refresh failed, so the entry was not started
    #[error("Entry '{entry_id}' is not ready: {source}")]
    NotReady {
        entry_id: String,
        #[source]
        source: RefreshError,
    },
}

/// Owns the running coordinators.
pub struct CoordinatorRegistry {
    coordinators: RwLock<HashMap<String, Coordinator>>,
    store: Arc<dyn ConfigStore>,
    api_factory: ApiFactory,
}

impl CoordinatorRegistry {
    /// Create a registry whose coordinators talk to the Todoist REST API.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            coordinators: RwLock::new(HashMap::new()),
            store,
            api_factory: Arc::new(rest_api),
        }
    }

    /// Replace how API implementations are built.
    #[must_use]
    pub fn with_api_factory(mut self, factory: ApiFactory) -> Self {
        self.api_factory = factory;
        self
    }

    /// Validate an entry, run its first refresh and start polling.
    ///
    /// A failed first refresh leaves nothing running.
    ///
    /// # Errors
    /// Returns error on invalid config, duplicate entry id, client
    /// construction failure or a failed first refresh.
    #[instrument(skip(self, config), fields(entry_id = %config.entry_id))]
    pub async fn setup_entry(&self, config: &EntryConfig) -> Result<Coordinator, RegistryError> {
        config.validate()?;
        if self.coordinators.read().await.contains_key(&config.entry_id) {
            return Err(RegistryError::AlreadySetUp(config.entry_id.clone()));
        }

        let api = (self.api_factory)(config)?;
        let coordinator = Coordinator::new(
            config.entry_id.clone(),
            config.project(),
            config.update_interval(),
            api,
            Arc::clone(&self.store),
        );

        if let Err(source) = coordinator.first_refresh().await {
            coordinator.shutdown().await;
            return Err(RegistryError::NotReady {
                entry_id: config.entry_id.clone(),
                source,
            });
        }

        let mut coordinators = self.coordinators.write().await;
        if coordinators.contains_key(&config.entry_id) {
            drop(coordinators);
            coordinator.shutdown().await;
            return Err(RegistryError::AlreadySetUp(config.entry_id.clone()));
        }

        coordinator
            .start_periodic_refresh(config.update_interval())
            .await;
        coordinators.insert(config.entry_id.clone(), coordinator.clone());
        info!("Todoist entry set up");

        Ok(coordinator)
    }

    /// Coordinator of an entry.
    pub async fn get(&self, entry_id: &str) -> Option<Coordinator> {
        self.coordinators.read().await.get(entry_id).cloned()
    }

    /// Ids of all running entries, sorted.
    pub async fn entry_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.coordinators.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Apply changed options to a running entry.
    ///
    /// The immediate refresh outcome is recorded on the coordinator.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownEntry`] if the entry is not running.
    pub async fn update_options(
        &self,
        entry_id: &str,
        update_interval: Duration,
    ) -> Result<(), RegistryError> {
        let coordinator = self
            .get(entry_id)
            .await
            .ok_or_else(|| RegistryError::UnknownEntry(entry_id.to_string()))?;

        if let Err(e) = coordinator.on_configuration_changed(update_interval).await {
            warn!(entry_id, error = %e, "Refresh after options update failed");
        }
        Ok(())
    }

    /// Stop and forget an entry. Returns whether it was running.
    pub async fn unload_entry(&self, entry_id: &str) -> bool {
        let removed = self.coordinators.write().await.remove(entry_id);
        match removed {
            Some(coordinator) => {
                coordinator.shutdown().await;
                info!(entry_id, "Todoist entry unloaded");
                true
            }
            None => false,
        }
    }

    /// Stop every entry.
    pub async fn shutdown(&self) {
        let coordinators: Vec<_> = self.coordinators.write().await.drain().collect();
        for (_, coordinator) in coordinators {
            coordinator.shutdown().await;
        }
    }
}

fn rest_api(config: &EntryConfig) -> Result<Arc<dyn TodoistApi>, ClientError> {
    let client = match &config.api_url {
        Some(url) => TodoistClient::with_url(&config.token, url)?,
        None => TodoistClient::new(&config.token)?,
    };
    Ok(Arc::new(client))
}
