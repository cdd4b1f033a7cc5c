//! In-process Todoist double for coordinator, schedule and registry tests.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::TodoistApi;
use crate::coordinator::SnapshotListener;
use crate::error::TransportError;
use crate::models::{RawRecord, Snapshot};

/// Scriptable API double that counts calls.
///
/// Every call sleeps for `delay` first, which lets paused-clock tests hold a
/// cycle in flight.
pub(crate) struct FakeApi {
    projects: Vec<RawRecord>,
    sections: Vec<RawRecord>,
    tasks: Mutex<Result<Vec<RawRecord>, TransportError>>,
    delay: Duration,
    project_calls: AtomicUsize,
    section_calls: AtomicUsize,
    task_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            projects: Vec::new(),
            sections: Vec::new(),
            tasks: Mutex::new(Ok(vec![json!({"id": 1, "content": "Buy milk"})])),
            delay: Duration::ZERO,
            project_calls: AtomicUsize::new(0),
            section_calls: AtomicUsize::new(0),
            task_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_projects(mut self, projects: Vec<RawRecord>) -> Self {
        self.projects = projects;
        self
    }

    pub fn with_sections(mut self, sections: Vec<RawRecord>) -> Self {
        self.sections = sections;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_tasks(&self, tasks: Vec<RawRecord>) {
        *self.tasks.lock().unwrap() = Ok(tasks);
    }

    pub fn fail_tasks(&self, status: u16) {
        *self.tasks.lock().unwrap() = Err(TransportError::Status {
            path: "/tasks".to_string(),
            status,
            body: "Internal Server Error".to_string(),
        });
    }

    pub fn project_calls(&self) -> usize {
        self.project_calls.load(Ordering::SeqCst)
    }

    pub fn section_calls(&self) -> usize {
        self.section_calls.load(Ordering::SeqCst)
    }

    pub fn task_calls(&self) -> usize {
        self.task_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl TodoistApi for FakeApi {
    async fn list_projects(&self) -> Result<Vec<RawRecord>, TransportError> {
        self.project_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self.projects.clone())
    }

    async fn list_sections(&self, _project_id: &str) -> Result<Vec<RawRecord>, TransportError> {
        self.section_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self.sections.clone())
    }

    async fn list_tasks(&self, _project_id: &str) -> Result<Vec<RawRecord>, TransportError> {
        self.task_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.tasks.lock().unwrap().clone()
    }
}

/// Listener that records every snapshot it is handed.
#[derive(Default)]
pub(crate) struct RecordingListener {
    pub received: Mutex<Vec<Arc<Snapshot>>>,
}

impl RecordingListener {
    pub fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

#[async_trait]
impl SnapshotListener for RecordingListener {
    async fn snapshot_published(&self, snapshot: &Arc<Snapshot>) {
        self.received.lock().unwrap().push(Arc::clone(snapshot));
    }
}
