//! Polling snapshot cache for a single Todoist project.
//!
//! This crate provides:
//! - REST client for the Todoist API (projects, sections, tasks)
//! - Normalization of loosely-typed API records into [`Snapshot`]s
//! - A refresh [`Coordinator`] with project-name resolution, single-flight
//!   refreshes and a hot-swappable polling interval
//! - A [`CoordinatorRegistry`] keyed by config entry id
//! - A sensor view (open task count plus task/section attributes)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use todoist_viewer::{CoordinatorRegistry, EntryConfig, MemoryConfigStore, ProjectRef};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = CoordinatorRegistry::new(Arc::new(MemoryConfigStore::new()));
//! let entry = EntryConfig::new("home", "your-token", ProjectRef::by_name("Home"));
//! let coordinator = registry.setup_entry(&entry).await?;
//!
//! if let Some(snapshot) = coordinator.snapshot().await {
//!     println!("{} open tasks", snapshot.open_task_count());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod normalize;
pub mod registry;
pub mod sensor;
pub mod store;

#[cfg(test)]
mod testing;

pub use client::{TodoistApi, TodoistClient};
pub use config::{ConfigFile, EntryConfig};
pub use coordinator::{Coordinator, CoordinatorStatus, ErrorInfo, SnapshotListener};
pub use error::{RefreshError, TransportError};
pub use models::*;
pub use registry::{CoordinatorRegistry, RegistryError};
pub use sensor::{SensorState, TaskSensor};
pub use store::{ConfigStore, FileConfigStore, MemoryConfigStore};
