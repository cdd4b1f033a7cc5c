//! Todoist entity type definitions.
//!
//! These are the normalized shapes every downstream consumer depends on.
//! Raw wire records stay [`RawRecord`] until they pass through
//! [`crate::normalize`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A loosely-typed record as returned by the Todoist REST API.
pub type RawRecord = serde_json::Value;

/// Identity of the monitored project.
///
/// At least one of the two fields must be non-empty at configuration time.
/// A configured `project_id` always wins over name resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectRef {
    /// Todoist project id, if known up front.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Human-readable project name, resolved to an id on first refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

impl ProjectRef {
    /// Reference a project by id.
    #[must_use]
    pub fn by_id(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            project_name: None,
        }
    }

    /// Reference a project by name.
    #[must_use]
    pub fn by_name(project_name: impl Into<String>) -> Self {
        Self {
            project_id: None,
            project_name: Some(project_name.into()),
        }
    }

    /// Configured project id, ignoring blank values.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        non_blank(self.project_id.as_deref())
    }

    /// Configured project name, ignoring blank values.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        non_blank(self.project_name.as_deref())
    }

    /// Whether either an id or a name is usable.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.id().is_some() || self.name().is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Todoist section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    /// Unique identifier
    pub id: String,
    /// Section name
    pub name: String,
    /// Position for ordering
    pub order: i64,
}

/// Todoist task (active tasks only, as the REST API returns them)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Task title (markdown)
    pub content: String,
    /// Task description (markdown)
    pub description: String,
    /// Whether the task is completed
    pub completed: bool,
    /// Priority (1 = normal, 4 = urgent)
    pub priority: u8,
    /// Label names, in API order
    pub labels: Vec<String>,
    /// Parent task id (for sub-tasks)
    pub parent_id: Option<String>,
    /// Section the task belongs to
    pub section_id: Option<String>,
    /// Project the task belongs to
    pub project_id: Option<String>,
    /// Due information, passed through untouched
    pub due: Option<serde_json::Value>,
    /// Position for ordering
    pub order: i64,
    /// URL to the task
    pub url: String,
}

impl Task {
    /// Whether the task is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.completed
    }
}

/// One immutable result of a refresh cycle.
///
/// A new snapshot fully replaces the previous one; there is no merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    /// Sections keyed by id
    pub sections: BTreeMap<String, Section>,
    /// Tasks in API order
    pub tasks: Vec<Task>,
}

impl Snapshot {
    /// Number of tasks that are not completed.
    #[must_use]
    pub fn open_task_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_open()).count()
    }

    /// Look up a task's section.
    #[must_use]
    pub fn section_of(&self, task: &Task) -> Option<&Section> {
        task.section_id
            .as_deref()
            .and_then(|id| self.sections.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            content: format!("task {id}"),
            description: String::new(),
            completed,
            priority: 1,
            labels: vec![],
            parent_id: None,
            section_id: None,
            project_id: None,
            due: None,
            order: 0,
            url: String::new(),
        }
    }

    #[test]
    fn test_project_ref_ignores_blank_values() {
        let project = ProjectRef {
            project_id: Some("  ".to_string()),
            project_name: Some(String::new()),
        };
        assert!(project.id().is_none());
        assert!(project.name().is_none());
        assert!(!project.is_usable());

        assert!(ProjectRef::by_name("Home").is_usable());
        assert_eq!(ProjectRef::by_id("42").id(), Some("42"));
    }

    #[test]
    fn test_open_task_count() {
        let snapshot = Snapshot {
            sections: BTreeMap::new(),
            tasks: vec![task("1", false), task("2", true), task("3", false)],
        };
        assert_eq!(snapshot.open_task_count(), 2);
    }

    #[test]
    fn test_section_of() {
        let mut snapshot = Snapshot::default();
        snapshot.sections.insert(
            "7".to_string(),
            Section {
                id: "7".to_string(),
                name: "Groceries".to_string(),
                order: 1,
            },
        );
        let mut filed = task("1", false);
        filed.section_id = Some("7".to_string());

        assert_eq!(
            snapshot.section_of(&filed).map(|s| s.name.as_str()),
            Some("Groceries")
        );
        assert!(snapshot.section_of(&task("2", false)).is_none());
    }

    #[test]
    fn test_project_ref_serialization_skips_missing_fields() {
        let json = serde_json::to_string(&ProjectRef::by_name("Home")).unwrap();
        assert_eq!(json, r#"{"project_name":"Home"}"#);
    }
}
