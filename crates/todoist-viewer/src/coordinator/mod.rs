//! Refresh coordinator for one Todoist project.
//!
//! The coordinator is the single authority for "what is the current task state
//! and is it fresh". It owns:
//!
//! - project identity resolution (name -> id, once, written back to the store)
//! - the polling schedule (see [`schedule`])
//! - single-flight refresh execution
//! - the last published [`Snapshot`] and the last error
//!
//! # Cycle
//!
//! ```text
//! Idle -> Resolving (until resolved) -> Fetching -> Publishing -> Idle
//! ```
//!
//! A failed cycle keeps the previous snapshot and records the error; nothing
//! escapes a periodic cycle. Only [`Coordinator::first_refresh`] hands its
//! failure back to the caller, so setup can refuse to come up stale.

mod schedule;
mod state;

pub use state::{CoordinatorStatus, ErrorInfo};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::client::TodoistApi;
use crate::error::RefreshError;
use crate::models::{ProjectRef, Snapshot};
use crate::normalize::{find_project_id, normalize};
use crate::store::ConfigStore;
use state::CoordinatorState;

/// Shortest interval the schedule accepts.
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// Result of one refresh cycle.
pub type RefreshOutcome = Result<Arc<Snapshot>, RefreshError>;

type SharedCycle = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Observer notified after every successful publish.
#[async_trait]
pub trait SnapshotListener: Send + Sync {
    /// Called once per published snapshot, in subscription order.
    async fn snapshot_published(&self, snapshot: &Arc<Snapshot>);
}

/// Handle returned by [`Coordinator::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Polls one Todoist project and caches the latest snapshot.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("entry_id", &self.inner.entry_id)
            .field("project", &self.inner.project)
            .field("update_interval", &*self.inner.interval_tx.borrow())
            .field("shut_down", &self.inner.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

struct Inner {
    entry_id: String,
    project: ProjectRef,
    api: Arc<dyn TodoistApi>,
    store: Arc<dyn ConfigStore>,
    state: RwLock<CoordinatorState>,
    in_flight: Mutex<Option<SharedCycle>>,
    listeners: RwLock<Vec<(SubscriptionId, Arc<dyn SnapshotListener>)>>,
    next_subscription: AtomicU64,
    interval_tx: watch::Sender<Duration>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Create a coordinator. Nothing is fetched until a refresh is requested.
    #[must_use]
    pub fn new(
        entry_id: impl Into<String>,
        project: ProjectRef,
        update_interval: Duration,
        api: Arc<dyn TodoistApi>,
        store: Arc<dyn ConfigStore>,
    ) -> Self {
        let (interval_tx, _) = watch::channel(update_interval.max(MIN_UPDATE_INTERVAL));
        Self {
            inner: Arc::new(Inner {
                entry_id: entry_id.into(),
                project,
                api,
                store,
                state: RwLock::new(CoordinatorState::default()),
                in_flight: Mutex::new(None),
                listeners: RwLock::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
                interval_tx,
                scheduler: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Config entry this coordinator belongs to.
    #[must_use]
    pub fn entry_id(&self) -> &str {
        &self.inner.entry_id
    }

    /// Configured project reference.
    #[must_use]
    pub fn project(&self) -> &ProjectRef {
        &self.inner.project
    }

    // =========================================================================
    // Triggers
    // =========================================================================

    /// Run the startup refresh.
    ///
    /// Unlike periodic refreshes, the failure is returned so the caller can
    /// abort setup instead of running with no data.
    ///
    /// # Errors
    /// Returns the cycle's error.
    pub async fn first_refresh(&self) -> RefreshOutcome {
        self.request_refresh().await.inspect_err(|e| {
            error!(
                entry_id = %self.inner.entry_id,
                error = %e,
                "Initial Todoist refresh failed"
            );
        })
    }

    /// Refresh now, or join the refresh already in flight.
    ///
    /// The outcome is also recorded in the coordinator state, so callers that
    /// only care about the side effect may ignore it.
    ///
    /// # Errors
    /// Returns the cycle's error, or [`RefreshError::ShutDown`] after
    /// [`Coordinator::shutdown`].
    pub async fn request_refresh(&self) -> RefreshOutcome {
        if self.inner.cancel.is_cancelled() {
            return Err(RefreshError::ShutDown);
        }

        let cycle = {
            let mut slot = self.inner.in_flight.lock().await;
            if let Some(cycle) = slot.as_ref() {
                debug!(entry_id = %self.inner.entry_id, "Joining in-flight refresh");
                cycle.clone()
            } else {
                let cycle = Arc::clone(&self.inner).spawn_cycle();
                *slot = Some(cycle.clone());
                cycle
            }
        };

        cycle.await
    }

    /// Start polling at `interval`. Calling it again while running only
    /// updates the interval.
    pub async fn start_periodic_refresh(&self, interval: Duration) {
        self.inner
            .interval_tx
            .send_replace(interval.max(MIN_UPDATE_INTERVAL));

        if self.inner.cancel.is_cancelled() {
            warn!(entry_id = %self.inner.entry_id, "Not starting schedule on a shut down coordinator");
            return;
        }

        let mut scheduler = self.inner.scheduler.lock().await;
        if scheduler.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!(entry_id = %self.inner.entry_id, "Periodic refresh already running");
            return;
        }

        info!(
            entry_id = %self.inner.entry_id,
            interval_secs = interval.as_secs(),
            "Starting periodic Todoist refresh"
        );
        *scheduler = Some(tokio::spawn(schedule::run(
            Arc::downgrade(&self.inner),
            self.inner.cancel.clone(),
            self.inner.interval_tx.subscribe(),
        )));
    }

    /// Apply a new update interval and refresh immediately.
    ///
    /// The timer is re-armed so the next scheduled tick is one full new
    /// interval from now. Resolved project id and snapshot are kept.
    ///
    /// # Errors
    /// Returns the outcome of the immediate refresh.
    pub async fn on_configuration_changed(&self, interval: Duration) -> RefreshOutcome {
        let interval = interval.max(MIN_UPDATE_INTERVAL);
        let previous = self.inner.interval_tx.send_replace(interval);
        info!(
            entry_id = %self.inner.entry_id,
            previous_secs = previous.as_secs(),
            interval_secs = interval.as_secs(),
            "Update interval changed"
        );
        self.request_refresh().await
    }

    /// Stop polling and abandon any in-flight cycle.
    ///
    /// A cycle that completes after this point discards its result.
    pub async fn shutdown(&self) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        info!(entry_id = %self.inner.entry_id, "Shutting down Todoist coordinator");
        self.inner.cancel.cancel();

        if let Some(handle) = self.inner.scheduler.lock().await.take() {
            handle.abort();
        }
        self.inner.listeners.write().await.clear();
    }

    /// Whether [`Coordinator::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // =========================================================================
    // Read surface
    // =========================================================================

    /// Last published snapshot.
    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.state.read().await.last_snapshot.clone()
    }

    /// Error of the most recent cycle, if it failed.
    pub async fn last_error(&self) -> Option<ErrorInfo> {
        self.inner.state.read().await.last_error.clone()
    }

    /// Snapshot present but the latest cycle failed.
    pub async fn is_stale(&self) -> bool {
        self.status().await.is_stale()
    }

    /// Project id resolved from the configured name, if any.
    pub async fn resolved_project_id(&self) -> Option<String> {
        self.inner.state.read().await.resolved_project_id.clone()
    }

    /// When the last snapshot was published.
    pub async fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state.read().await.last_success_at
    }

    /// Current polling interval.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        *self.inner.interval_tx.borrow()
    }

    /// Whether a cycle is running right now.
    pub async fn is_refreshing(&self) -> bool {
        self.inner.in_flight.lock().await.is_some()
    }

    /// Everything a consumer needs, read under one lock.
    pub async fn status(&self) -> CoordinatorStatus {
        let state = self.inner.state.read().await;
        CoordinatorStatus {
            snapshot: state.last_snapshot.clone(),
            last_error: state.last_error.clone(),
            project_id: self
                .inner
                .project
                .id()
                .map(str::to_string)
                .or_else(|| state.resolved_project_id.clone()),
            last_success_at: state.last_success_at,
            last_attempt_at: state.last_attempt_at,
        }
    }

    /// Register a listener for future publishes.
    pub async fn subscribe(&self, listener: Arc<dyn SnapshotListener>) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().await.push((id, listener));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.inner.listeners.write().await;
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }
}

impl Inner {
    /// Spawn a cycle as its own task and return a joinable handle to it.
    ///
    /// The task clears the in-flight slot itself, so the slot is released even
    /// if every caller drops its future. Listeners run after the slot is
    /// cleared, which lets a listener request the next cycle.
    fn spawn_cycle(self: Arc<Self>) -> SharedCycle {
        let handle = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(self.run_cycle())
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(entry_id = %self.entry_id, "Refresh cycle panicked");
                    Err(RefreshError::Internal("refresh cycle panicked".to_string()))
                });
            self.in_flight.lock().await.take();

            if let Ok(snapshot) = &outcome {
                self.notify(snapshot).await;
            }
            outcome
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                if e.is_cancelled() {
                    Err(RefreshError::ShutDown)
                } else {
                    Err(RefreshError::Internal(e.to_string()))
                }
            })
        }
        .boxed()
        .shared()
    }

    #[instrument(skip(self), fields(entry_id = %self.entry_id))]
    async fn run_cycle(&self) -> RefreshOutcome {
        self.state.write().await.last_attempt_at = Some(Utc::now());

        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(RefreshError::ShutDown),
            result = self.fetch() => result,
        };

        if self.cancel.is_cancelled() {
            debug!("Discarding refresh result after shutdown");
            return Err(RefreshError::ShutDown);
        }

        match result {
            Ok(snapshot) => Ok(self.publish(snapshot).await),
            Err(e) => {
                warn!(
                    error = %e,
                    kind = e.kind(),
                    "Todoist refresh failed, keeping previous snapshot"
                );
                self.state.write().await.last_error = Some(ErrorInfo::now(e.clone()));
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<Snapshot, RefreshError> {
        let project_id = self.resolve_project_id().await?;

        let (sections, tasks) = tokio::try_join!(
            self.api.list_sections(&project_id),
            self.api.list_tasks(&project_id),
        )?;

        Ok(normalize(&sections, &tasks))
    }

    /// Configured id, else the previously resolved id, else look the name up.
    async fn resolve_project_id(&self) -> Result<String, RefreshError> {
        if let Some(id) = self.project.id() {
            return Ok(id.to_string());
        }
        if let Some(id) = self.state.read().await.resolved_project_id.clone() {
            return Ok(id);
        }
        let Some(name) = self.project.name() else {
            return Err(RefreshError::UnresolvedProject);
        };

        let projects = self.api.list_projects().await?;
        let project_id =
            find_project_id(&projects, name).ok_or_else(|| RefreshError::ProjectNotFound {
                name: name.to_string(),
            })?;

        info!(project_name = name, project_id = %project_id, "Resolved Todoist project");
        self.state.write().await.resolved_project_id = Some(project_id.clone());

        if let Err(e) = self
            .store
            .persist_project_id(&self.entry_id, &project_id)
            .await
        {
            warn!(error = %e, "Could not persist resolved project id");
        }

        Ok(project_id)
    }

    async fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        {
            let mut state = self.state.write().await;
            state.last_snapshot = Some(Arc::clone(&snapshot));
            state.last_error = None;
            state.last_success_at = Some(Utc::now());
        }

        info!(
            tasks = snapshot.tasks.len(),
            open = snapshot.open_task_count(),
            sections = snapshot.sections.len(),
            "Published Todoist snapshot"
        );

        snapshot
    }

    /// Hand a published snapshot to every listener, in subscription order.
    ///
    /// A panicking listener is logged and skipped; the cycle still succeeded.
    async fn notify(&self, snapshot: &Arc<Snapshot>) {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .await
            .iter()
            .map(|(id, l)| (*id, Arc::clone(l)))
            .collect();

        for (id, listener) in listeners {
            if AssertUnwindSafe(listener.snapshot_published(snapshot))
                .catch_unwind()
                .await
                .is_err()
            {
                error!(
                    entry_id = %self.entry_id,
                    subscription = id.0,
                    "Snapshot listener panicked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTodoistApi;
    use crate::error::TransportError;
    use crate::store::MemoryConfigStore;
    use crate::testing::{FakeApi, RecordingListener};
    use serde_json::json;
    use std::sync::atomic::AtomicBool;

    const INTERVAL: Duration = Duration::from_secs(300);

    fn coordinator(project: ProjectRef, api: Arc<dyn TodoistApi>) -> Coordinator {
        Coordinator::new(
            "entry-1",
            project,
            INTERVAL,
            api,
            Arc::new(MemoryConfigStore::new()),
        )
    }

    #[tokio::test]
    async fn test_resolves_project_name_once() {
        let mut api = MockTodoistApi::new();
        api.expect_list_projects()
            .times(1)
            .returning(|| Ok(vec![json!({"id": 42, "name": "Home"})]));
        api.expect_list_sections()
            .withf(|id| id == "42")
            .times(2)
            .returning(|_| Ok(vec![]));
        api.expect_list_tasks()
            .withf(|id| id == "42")
            .times(2)
            .returning(|_| Ok(vec![json!({"id": 1, "content": "Buy milk"})]));

        let store = Arc::new(MemoryConfigStore::new());
        let coordinator = Coordinator::new(
            "entry-1",
            ProjectRef::by_name("Home"),
            INTERVAL,
            Arc::new(api),
            store.clone(),
        );

        coordinator.first_refresh().await.unwrap();
        assert_eq!(coordinator.resolved_project_id().await.as_deref(), Some("42"));
        assert_eq!(store.project_id("entry-1").await.as_deref(), Some("42"));

        coordinator.request_refresh().await.unwrap();
        assert_eq!(coordinator.status().await.project_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_configured_id_skips_resolution() {
        let mut api = MockTodoistApi::new();
        api.expect_list_projects().never();
        api.expect_list_sections().returning(|_| Ok(vec![]));
        api.expect_list_tasks().returning(|_| Ok(vec![]));

        let coordinator = coordinator(
            ProjectRef {
                project_id: Some("7".to_string()),
                project_name: Some("Home".to_string()),
            },
            Arc::new(api),
        );

        coordinator.request_refresh().await.unwrap();
        assert!(coordinator.resolved_project_id().await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_project_name_records_error() {
        let mut api = MockTodoistApi::new();
        api.expect_list_projects()
            .times(2)
            .returning(|| Ok(vec![json!({"id": 42, "name": "Home"})]));
        api.expect_list_sections().never();
        api.expect_list_tasks().never();

        let coordinator = coordinator(ProjectRef::by_name("Ghost"), Arc::new(api));

        let result = coordinator.first_refresh().await;
        assert_eq!(
            result.unwrap_err(),
            RefreshError::ProjectNotFound {
                name: "Ghost".to_string()
            }
        );
        assert!(coordinator.snapshot().await.is_none());
        assert!(coordinator.resolved_project_id().await.is_none());
        assert!(matches!(
            coordinator.last_error().await.map(|e| e.error),
            Some(RefreshError::ProjectNotFound { .. })
        ));

        // Next cycle retries resolution.
        assert!(coordinator.request_refresh().await.is_err());
    }

    #[tokio::test]
    async fn test_unusable_project_ref_is_unresolved() {
        let mut api = MockTodoistApi::new();
        api.expect_list_projects().never();

        let coordinator = coordinator(ProjectRef::default(), Arc::new(api));
        assert_eq!(
            coordinator.first_refresh().await.unwrap_err(),
            RefreshError::UnresolvedProject
        );
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_previous_snapshot() {
        let api = Arc::new(FakeApi::new());
        let coordinator = coordinator(ProjectRef::by_id("42"), api.clone());

        let first = coordinator.first_refresh().await.unwrap();
        assert!(!coordinator.is_stale().await);

        api.fail_tasks(500);
        let err = coordinator.request_refresh().await.unwrap_err();
        assert!(matches!(
            &err,
            RefreshError::Transport(TransportError::Status { status: 500, .. })
        ));

        let current = coordinator.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(
            coordinator.last_error().await.map(|e| e.error),
            Some(err)
        );
        assert!(coordinator.is_stale().await);
    }

    #[tokio::test]
    async fn test_successful_refresh_clears_error() {
        let api = Arc::new(FakeApi::new());
        let coordinator = coordinator(ProjectRef::by_id("42"), api.clone());

        api.fail_tasks(503);
        assert!(coordinator.request_refresh().await.is_err());
        assert!(coordinator.last_error().await.is_some());

        api.set_tasks(vec![json!({"id": 9, "content": "Water plants"})]);
        let snapshot = coordinator.request_refresh().await.unwrap();
        assert_eq!(snapshot.tasks[0].content, "Water plants");
        assert!(coordinator.last_error().await.is_none());
        assert!(coordinator.last_success_at().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refreshes_share_one_fetch() {
        let api = Arc::new(FakeApi::new().with_delay(Duration::from_secs(5)));
        let coordinator = coordinator(ProjectRef::by_id("42"), api.clone());

        let (a, b) = tokio::join!(coordinator.request_refresh(), coordinator.request_refresh());

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(api.section_calls(), 1);
        assert_eq!(api.task_calls(), 1);
        assert!(!coordinator.is_refreshing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_refreshes_fetch_again() {
        let api = Arc::new(FakeApi::new());
        let coordinator = coordinator(ProjectRef::by_id("42"), api.clone());

        coordinator.request_refresh().await.unwrap();
        coordinator.request_refresh().await.unwrap();
        assert_eq!(api.task_calls(), 2);
    }

    #[tokio::test]
    async fn test_listeners_notified_once_per_publish() {
        let api = Arc::new(FakeApi::new());
        let coordinator = coordinator(ProjectRef::by_id("42"), api.clone());
        let listener = Arc::new(RecordingListener::default());
        let id = coordinator.subscribe(listener.clone()).await;

        coordinator.request_refresh().await.unwrap();
        api.fail_tasks(500);
        let _ = coordinator.request_refresh().await;
        assert_eq!(listener.count(), 1);

        assert!(coordinator.unsubscribe(id).await);
        assert!(!coordinator.unsubscribe(id).await);
        api.set_tasks(vec![]);
        coordinator.request_refresh().await.unwrap();
        assert_eq!(listener.count(), 1);
    }

    /// Requests one follow-up refresh from inside its first notification.
    struct RefreshingListener {
        coordinator: Coordinator,
        fired: AtomicBool,
        follow_up: std::sync::Mutex<Option<RefreshOutcome>>,
    }

    #[async_trait]
    impl SnapshotListener for RefreshingListener {
        async fn snapshot_published(&self, _snapshot: &Arc<Snapshot>) {
            if !self.fired.swap(true, Ordering::SeqCst) {
                let outcome = self.coordinator.request_refresh().await;
                *self.follow_up.lock().unwrap() = Some(outcome);
            }
        }
    }

    struct PanickingListener;

    #[async_trait]
    impl SnapshotListener for PanickingListener {
        async fn snapshot_published(&self, _snapshot: &Arc<Snapshot>) {
            panic!("listener failure");
        }
    }

    #[tokio::test]
    async fn test_listener_can_request_refresh() {
        let api = Arc::new(FakeApi::new());
        let coordinator = coordinator(ProjectRef::by_id("42"), api.clone());
        let listener = Arc::new(RefreshingListener {
            coordinator: coordinator.clone(),
            fired: AtomicBool::new(false),
            follow_up: std::sync::Mutex::new(None),
        });
        coordinator.subscribe(listener.clone()).await;

        let first = tokio::time::timeout(Duration::from_secs(5), coordinator.request_refresh())
            .await
            .expect("refresh must not wait on its own listeners");
        assert!(first.is_ok());
        assert_eq!(api.task_calls(), 2);
        assert!(matches!(
            listener.follow_up.lock().unwrap().as_ref(),
            Some(Ok(_))
        ));
        assert!(!coordinator.is_refreshing().await);

        let later = tokio::time::timeout(Duration::from_secs(5), coordinator.request_refresh())
            .await
            .expect("coordinator must stay usable");
        assert!(later.is_ok());
        assert_eq!(api.task_calls(), 3);

        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_fail_cycle() {
        let api = Arc::new(FakeApi::new());
        let coordinator = coordinator(ProjectRef::by_id("42"), api.clone());
        let recorder = Arc::new(RecordingListener::default());
        coordinator.subscribe(Arc::new(PanickingListener)).await;
        coordinator.subscribe(recorder.clone()).await;

        let snapshot = coordinator.request_refresh().await.unwrap();

        assert_eq!(recorder.count(), 1);
        assert!(coordinator.last_error().await.is_none());
        assert!(Arc::ptr_eq(
            &snapshot,
            &coordinator.snapshot().await.unwrap()
        ));
        assert!(!coordinator.is_refreshing().await);
        assert!(coordinator.request_refresh().await.is_ok());
    }

    #[test]
    fn test_debug_shows_entry_and_project() {
        let coordinator = coordinator(ProjectRef::by_name("Home"), Arc::new(FakeApi::new()));
        let debug = format!("{coordinator:?}");
        assert!(debug.contains("entry-1"));
        assert!(debug.contains("Home"));
        assert!(!debug.contains("token"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_in_flight_cycle() {
        let api = Arc::new(FakeApi::new().with_delay(Duration::from_secs(10)));
        let coordinator = coordinator(ProjectRef::by_id("42"), api.clone());

        let pending = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.request_refresh().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(coordinator.is_refreshing().await);

        coordinator.shutdown().await;
        assert_eq!(pending.await.unwrap().unwrap_err(), RefreshError::ShutDown);
        assert!(coordinator.snapshot().await.is_none());
        assert!(coordinator.last_error().await.is_none());

        assert_eq!(
            coordinator.request_refresh().await.unwrap_err(),
            RefreshError::ShutDown
        );
        assert!(coordinator.is_shut_down());
    }
}
