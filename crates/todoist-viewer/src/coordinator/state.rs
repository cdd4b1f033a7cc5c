//! Coordinator-owned state and the read-only views handed to consumers.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::RefreshError;
use crate::models::Snapshot;

/// A recorded refresh failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// What went wrong
    pub error: RefreshError,
    /// When the failed cycle ended
    pub occurred_at: DateTime<Utc>,
}

impl ErrorInfo {
    pub(crate) fn now(error: RefreshError) -> Self {
        Self {
            error,
            occurred_at: Utc::now(),
        }
    }
}

/// Mutable state of one coordinator. Only refresh cycles write to it.
#[derive(Debug, Default)]
pub(crate) struct CoordinatorState {
    pub last_snapshot: Option<Arc<Snapshot>>,
    pub last_error: Option<ErrorInfo>,
    pub resolved_project_id: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of a coordinator, read under a single lock.
#[derive(Debug, Clone)]
pub struct CoordinatorStatus {
    /// Last published snapshot
    pub snapshot: Option<Arc<Snapshot>>,
    /// Error of the most recent cycle, cleared by the next publish
    pub last_error: Option<ErrorInfo>,
    /// Project id in use, configured or resolved
    pub project_id: Option<String>,
    /// When the last snapshot was published
    pub last_success_at: Option<DateTime<Utc>>,
    /// When the last cycle started
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl CoordinatorStatus {
    /// A snapshot is present but the latest cycle failed.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.snapshot.is_some() && self.last_error.is_some()
    }

    /// A snapshot is present and the latest cycle published it.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.snapshot.is_some() && self.last_error.is_none()
    }
}
