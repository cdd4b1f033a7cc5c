//! Configuration for Todoist viewer entries.
//!
//! An entry is one monitored project: a token, a project reference and an
//! update interval. Entries come from the environment (single entry) or from a
//! TOML file with one `[[entries]]` table per project.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::models::ProjectRef;

/// Default polling interval (seconds).
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;

/// Entry id used when none is configured.
pub const DEFAULT_ENTRY_ID: &str = "default";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a project id nor a project name was given
    #[error("Entry '{entry_id}': project_id or project_name is required")]
    ProjectRequired { entry_id: String },

    /// No API token was given
    #[error("Entry '{entry_id}': token is required")]
    MissingToken { entry_id: String },

    /// Update interval must be positive
    #[error("Entry '{entry_id}': update_interval_secs must be greater than 0")]
    InvalidInterval { entry_id: String },

    /// Two entries share an id
    #[error("Duplicate entry id '{0}'")]
    DuplicateEntry(String),

    /// Config file could not be read or written
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be rendered back to TOML
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// One configured project.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryConfig {
    /// Stable identity of this entry (registry key).
    #[serde(default = "default_entry_id")]
    pub entry_id: String,
    /// Todoist personal API token.
    pub token: String,
    /// Project id, if known. Written back once a name has been resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Project name to resolve when no id is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Polling interval in seconds.
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
    /// Override for the API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

fn default_entry_id() -> String {
    DEFAULT_ENTRY_ID.to_string()
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

// Token stays out of logs.
impl fmt::Debug for EntryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryConfig")
            .field("entry_id", &self.entry_id)
            .field("token", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("project_name", &self.project_name)
            .field("update_interval_secs", &self.update_interval_secs)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl EntryConfig {
    /// Create an entry for the given token and project.
    #[must_use]
    pub fn new(entry_id: impl Into<String>, token: impl Into<String>, project: ProjectRef) -> Self {
        Self {
            entry_id: entry_id.into(),
            token: token.into(),
            project_id: project.project_id,
            project_name: project.project_name,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            api_url: None,
        }
    }

    /// Set the update interval.
    #[must_use]
    pub fn with_update_interval(mut self, secs: u64) -> Self {
        self.update_interval_secs = secs;
        self
    }

    /// Point the entry at a different API base URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    /// Build an entry from environment variables.
    ///
    /// Reads `TODOIST_API_TOKEN`, `TODOIST_PROJECT_ID`, `TODOIST_PROJECT_NAME`,
    /// `TODOIST_UPDATE_INTERVAL`, `TODOIST_API_URL` and `TODOIST_ENTRY_ID`.
    /// The result is not validated; call [`EntryConfig::validate`].
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            entry_id: env::var("TODOIST_ENTRY_ID")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(default_entry_id),
            token: env::var("TODOIST_API_TOKEN").unwrap_or_default(),
            project_id: env::var("TODOIST_PROJECT_ID")
                .ok()
                .filter(|s| !s.is_empty()),
            project_name: env::var("TODOIST_PROJECT_NAME")
                .ok()
                .filter(|s| !s.is_empty()),
            update_interval_secs: env::var("TODOIST_UPDATE_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS),
            api_url: env::var("TODOIST_API_URL").ok().filter(|s| !s.is_empty()),
        }
    }

    /// Project reference of this entry.
    #[must_use]
    pub fn project(&self) -> ProjectRef {
        ProjectRef {
            project_id: self.project_id.clone(),
            project_name: self.project_name.clone(),
        }
    }

    /// Polling interval.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// Check the entry is usable.
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingToken {
                entry_id: self.entry_id.clone(),
            });
        }
        if !self.project().is_usable() {
            return Err(ConfigError::ProjectRequired {
                entry_id: self.entry_id.clone(),
            });
        }
        if self.update_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval {
                entry_id: self.entry_id.clone(),
            });
        }
        Ok(())
    }
}

/// Contents of a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigFile {
    /// Configured entries.
    #[serde(default)]
    pub entries: Vec<EntryConfig>,
}

impl ConfigFile {
    /// Parse TOML text.
    ///
    /// # Errors
    /// Returns error on malformed TOML or duplicate entry ids.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let file: Self = toml::from_str(text)?;
        let mut ids = HashSet::new();
        for entry in &file.entries {
            if !ids.insert(entry.entry_id.as_str()) {
                return Err(ConfigError::DuplicateEntry(entry.entry_id.clone()));
            }
        }
        Ok(file)
    }

    /// Load a config file from disk.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Write the config file to disk.
    ///
    /// # Errors
    /// Returns error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find an entry by id.
    pub fn entry_mut(&mut self, entry_id: &str) -> Option<&mut EntryConfig> {
        self.entries.iter_mut().find(|e| e.entry_id == entry_id)
    }
}
