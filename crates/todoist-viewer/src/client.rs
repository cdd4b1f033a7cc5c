//! REST client for the Todoist API (v2).
//!
//! Read-only: the coordinator only ever lists projects, sections and tasks.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::error::TransportError;
use crate::models::RawRecord;

/// Todoist REST API endpoint
pub const TODOIST_API_URL: &str = "https://api.todoist.com/rest/v2";

/// Upper bound for every request, connect through body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read operations the coordinator needs from Todoist.
///
/// Implemented by [`TodoistClient`] over HTTP; tests substitute their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoistApi: Send + Sync {
    /// List every project visible to the token.
    async fn list_projects(&self) -> Result<Vec<RawRecord>, TransportError>;

    /// List the sections of a project.
    async fn list_sections(&self, project_id: &str) -> Result<Vec<RawRecord>, TransportError>;

    /// List the active tasks of a project.
    async fn list_tasks(&self, project_id: &str) -> Result<Vec<RawRecord>, TransportError>;
}

/// Errors building a [`TodoistClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Token contains characters not allowed in a header
    #[error("Invalid API token")]
    InvalidToken,

    /// The underlying HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Todoist REST client
#[derive(Debug, Clone)]
pub struct TodoistClient {
    client: reqwest::Client,
    api_url: String,
}

impl TodoistClient {
    /// Create a new client authenticating with a personal API token.
    ///
    /// # Errors
    /// Returns error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(token: &str) -> Result<Self, ClientError> {
        Self::with_url(token, TODOIST_API_URL)
    }

    /// Create a client against a custom base URL (tests, proxies).
    ///
    /// # Errors
    /// Same as [`TodoistClient::new`].
    pub fn with_url(token: &str, api_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(token, api_url, REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout.
    ///
    /// # Errors
    /// Same as [`TodoistClient::new`].
    pub fn with_timeout(token: &str, api_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ClientError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Issue a GET and decode a JSON array body.
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<RawRecord>, TransportError> {
        let url = format!("{}{path}", self.api_url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(path, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TransportError::from_reqwest(path, &e))?;

        match body {
            Value::Array(items) => {
                debug!(path, count = items.len(), "Todoist API call succeeded");
                Ok(items)
            }
            other => Err(TransportError::Decode {
                path: path.to_string(),
                message: format!("expected a JSON array, got {}", json_kind(&other)),
            }),
        }
    }
}

#[async_trait]
impl TodoistApi for TodoistClient {
    #[instrument(skip(self))]
    async fn list_projects(&self) -> Result<Vec<RawRecord>, TransportError> {
        self.get("/projects", &[]).await
    }

    #[instrument(skip(self))]
    async fn list_sections(&self, project_id: &str) -> Result<Vec<RawRecord>, TransportError> {
        self.get("/sections", &[("project_id", project_id)]).await
    }

    /// Only active tasks are returned by this endpoint.
    #[instrument(skip(self))]
    async fn list_tasks(&self, project_id: &str) -> Result<Vec<RawRecord>, TransportError> {
        self.get("/tasks", &[("project_id", project_id)]).await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
