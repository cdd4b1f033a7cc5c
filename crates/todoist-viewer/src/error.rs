//! Error types for the Todoist client and refresh coordinator.

use thiserror::Error;

/// Errors raised by the Todoist REST client.
///
/// This is the only error kind the client surfaces. All variants are
/// recoverable from the coordinator's point of view. Values are cloneable so
/// one failed cycle can be reported to every caller that joined it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The API answered outside the success range
    #[error("Todoist API {path} failed: {status} {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    /// The request exceeded its timeout
    #[error("Todoist API {path} timed out")]
    Timeout { path: String },

    /// Connection-level failure (DNS, TLS, reset, ...)
    #[error("Failed to send request to Todoist API {path}: {message}")]
    Request { path: String, message: String },

    /// The response body was not the expected JSON
    #[error("Failed to parse Todoist API {path} response: {message}")]
    Decode { path: String, message: String },
}

impl TransportError {
    /// HTTP status of the failed response, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// API path of the failed request.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Status { path, .. }
            | Self::Timeout { path }
            | Self::Request { path, .. }
            | Self::Decode { path, .. } => path,
        }
    }

    pub(crate) fn from_reqwest(path: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                path: path.to_string(),
            }
        } else if err.is_decode() {
            Self::Decode {
                path: path.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::Request {
                path: path.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Why a refresh cycle ended without publishing a snapshot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// Network or HTTP failure talking to Todoist
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No project in the account carries the configured name
    #[error("Project named '{name}' not found in Todoist account")]
    ProjectNotFound { name: String },

    /// Neither a project id nor a project name is usable
    #[error("Todoist project not resolved. Provide project_id or project_name")]
    UnresolvedProject,

    /// The coordinator was shut down before or during the cycle
    #[error("Coordinator has been shut down")]
    ShutDown,

    /// The refresh task itself failed
    #[error("Refresh task failed: {0}")]
    Internal(String),
}

impl RefreshError {
    /// Short machine-readable kind, used in logs and the sensor view.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::ProjectNotFound { .. } => "project_not_found",
            Self::UnresolvedProject => "unresolved_project",
            Self::ShutDown => "shut_down",
            Self::Internal(_) => "internal",
        }
    }
}
