//! Conversion of raw Todoist records into a [`Snapshot`].
//!
//! The REST API is loose about wire types: ids arrive as numbers or strings,
//! older payloads carry `completed` instead of `is_completed`, and optional
//! fields are sometimes `null`, sometimes `""`, sometimes missing. Everything is
//! coerced here, once, so the rest of the crate only sees [`Section`] and
//! [`Task`].
//!
//! [`normalize`] is deterministic: the same input always yields an equal
//! snapshot.

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::models::{RawRecord, Section, Snapshot, Task};

/// Priority used when the payload carries none.
pub const DEFAULT_PRIORITY: u8 = 1;

/// Highest priority Todoist defines ("urgent").
pub const MAX_PRIORITY: u8 = 4;

/// Order used when the payload carries none.
pub const DEFAULT_ORDER: i64 = 0;

/// Build a snapshot from raw section and task records.
///
/// Records without a usable `id` are dropped. Duplicate task ids keep the first
/// occurrence; duplicate section ids keep the last, matching map insertion.
#[must_use]
pub fn normalize(sections: &[RawRecord], tasks: &[RawRecord]) -> Snapshot {
    let sections: BTreeMap<String, Section> = sections
        .iter()
        .filter_map(normalize_section)
        .map(|s| (s.id.clone(), s))
        .collect();

    let mut seen = HashSet::new();
    let tasks = tasks
        .iter()
        .filter_map(normalize_task)
        .filter(|t| seen.insert(t.id.clone()))
        .collect();

    Snapshot { sections, tasks }
}

/// Normalize a single section record.
#[must_use]
pub fn normalize_section(raw: &RawRecord) -> Option<Section> {
    let id = raw.get("id").and_then(id_string)?;
    Some(Section {
        id,
        name: text(raw.get("name")),
        order: integer(raw.get("order")).unwrap_or(DEFAULT_ORDER),
    })
}

/// Normalize a single task record.
#[must_use]
pub fn normalize_task(raw: &RawRecord) -> Option<Task> {
    let id = raw.get("id").and_then(id_string)?;

    let completed = raw.get("is_completed").is_some_and(truthy)
        || raw.get("completed").is_some_and(truthy);

    let priority = integer(raw.get("priority")).map_or(DEFAULT_PRIORITY, |p| {
        // Clamped into range, so the narrowing cast cannot truncate.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let p = p.clamp(i64::from(DEFAULT_PRIORITY), i64::from(MAX_PRIORITY)) as u8;
        p
    });

    Some(Task {
        id,
        content: text(raw.get("content")),
        description: text(raw.get("description")),
        completed,
        priority,
        labels: labels(raw.get("labels")),
        parent_id: linkage(raw.get("parent_id")),
        section_id: linkage(raw.get("section_id")),
        project_id: linkage(raw.get("project_id")),
        due: raw.get("due").filter(|d| !d.is_null()).cloned(),
        order: integer(raw.get("order")).unwrap_or(DEFAULT_ORDER),
        url: text(raw.get("url")),
    })
}

/// Id of the first project whose name matches exactly (no case folding).
///
/// Several projects may share a name; list order decides.
#[must_use]
pub fn find_project_id(projects: &[RawRecord], name: &str) -> Option<String> {
    projects
        .iter()
        .filter(|p| p.get("name").and_then(Value::as_str) == Some(name))
        .find_map(|p| p.get("id").and_then(id_string))
}

/// Truthiness as the Todoist payloads use it: `false`, `0`, `""`, `null` and
/// empty containers are false.
#[must_use]
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Coerce a numeric or string id into its string form.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Optional reference to another entity. Falsy values mean "absent".
fn linkage(value: Option<&Value>) -> Option<String> {
    value.filter(|v| truthy(v)).and_then(id_string)
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn labels(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(_) | Value::Bool(_) => Some(item.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
