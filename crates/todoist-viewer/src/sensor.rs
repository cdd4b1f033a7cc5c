//! Read-only sensor view over a coordinator.
//!
//! The state value is the number of open tasks; the full task list and section
//! map ride along as attributes for card-style renderers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::coordinator::{Coordinator, CoordinatorStatus};
use crate::models::{Section, Task};

/// Display name of the sensor.
pub const SENSOR_NAME: &str = "Todoist Tasks";

/// Icon hint for renderers.
pub const SENSOR_ICON: &str = "mdi:format-list-checkbox";

/// Serializable sensor reading.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SensorState {
    /// Stable id, derived from the entry id
    pub unique_id: String,
    /// Display name
    pub name: String,
    /// Icon hint
    pub icon: String,
    /// Number of open tasks (0 until the first publish)
    pub state: usize,
    /// Last cycle succeeded
    pub available: bool,
    /// Data present but the last cycle failed
    pub stale: bool,
    /// Last failure, if the latest cycle failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<SensorError>,
    /// When the data was last published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Tasks and sections
    pub attributes: SensorAttributes,
}

/// Failure details exposed to renderers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SensorError {
    /// Machine-readable kind
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// When it happened
    pub occurred_at: DateTime<Utc>,
}

/// Extra state attributes.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SensorAttributes {
    /// All tasks of the snapshot
    pub tasks: Vec<Task>,
    /// Sections keyed by id
    pub sections: BTreeMap<String, Section>,
}

impl SensorState {
    /// Build a reading from a coordinator status.
    #[must_use]
    pub fn from_status(entry_id: &str, status: &CoordinatorStatus) -> Self {
        let (state, attributes) = status.snapshot.as_ref().map_or_else(
            || (0, SensorAttributes::default()),
            |snapshot| {
                (
                    snapshot.open_task_count(),
                    SensorAttributes {
                        tasks: snapshot.tasks.clone(),
                        sections: snapshot.sections.clone(),
                    },
                )
            },
        );

        Self {
            unique_id: format!("{entry_id}_tasks"),
            name: SENSOR_NAME.to_string(),
            icon: SENSOR_ICON.to_string(),
            state,
            available: status.is_fresh(),
            stale: status.is_stale(),
            last_error: status.last_error.as_ref().map(|info| SensorError {
                kind: info.error.kind().to_string(),
                message: info.error.to_string(),
                occurred_at: info.occurred_at,
            }),
            last_updated: status.last_success_at,
            attributes,
        }
    }
}

/// Sensor bound to one coordinator.
#[derive(Clone)]
pub struct TaskSensor {
    coordinator: Coordinator,
}

impl TaskSensor {
    /// Wrap a coordinator.
    #[must_use]
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }

    /// Current reading.
    pub async fn state(&self) -> SensorState {
        SensorState::from_status(self.coordinator.entry_id(), &self.coordinator.status().await)
    }
}
