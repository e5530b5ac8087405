//! Usage collection query lifecycle.
//!
//! A query is created with [`Queries::submit`], observed with
//! [`Queries::status`] until it reaches DONE, FAILED or CANCELED, then released
//! with [`Queries::delete`]. The [`QueryId`] returned by `submit` is the only
//! handle; all other state lives on the server.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::http::{Transport, expect_status, read_json};
use super::models::{DataEnvelope, QueryStatus, TaskList, UsageCollection};
use crate::error::{Result, UsageError};

const INFRA_USAGE: &str = "infra_usage";
const TASKS: &str = "tasks";

// =============================================================================
// Query identifiers
// =============================================================================

/// Handle of a server-side query: `<orchestrator>/infra_usage/<collector>/tasks/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId {
    orchestrator: String,
    collector: String,
    task: String,
}

impl QueryId {
    /// Build an id from its parts.
    ///
    /// # Errors
    ///
    /// [`UsageError::Protocol`] if a part is empty or contains `/`.
    pub fn new(
        orchestrator: impl Into<String>,
        collector: impl Into<String>,
        task: impl Into<String>,
    ) -> Result<Self> {
        let id = Self {
            orchestrator: orchestrator.into(),
            collector: collector.into(),
            task: task.into(),
        };
        for (name, value) in [
            ("orchestrator", &id.orchestrator),
            ("collector", &id.collector),
            ("task", &id.task),
        ] {
            if value.is_empty() || value.contains('/') {
                return Err(UsageError::Protocol(format!(
                    "invalid {name} segment '{value}' in query id"
                )));
            }
        }
        Ok(id)
    }

    /// Parse the full reference form.
    ///
    /// # Errors
    ///
    /// [`UsageError::Protocol`] when the reference does not have the
    /// `<orchestrator>/infra_usage/<collector>/tasks/<id>` shape.
    pub fn parse(reference: &str) -> Result<Self> {
        let segments: Vec<&str> = reference.split('/').collect();
        match segments.as_slice() {
            [orchestrator, INFRA_USAGE, collector, TASKS, task] => {
                Self::new(*orchestrator, *collector, *task)
            }
            _ => Err(UsageError::Protocol(format!(
                "malformed query reference '{reference}', expected \
                 <orchestrator>/{INFRA_USAGE}/<collector>/{TASKS}/<id>"
            ))),
        }
    }

    #[must_use]
    pub fn orchestrator(&self) -> &str {
        &self.orchestrator
    }

    #[must_use]
    pub fn collector(&self) -> &str {
        &self.collector
    }

    #[must_use]
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Form relative to the orchestrator's usage listing: `<collector>/tasks/<id>`.
    #[must_use]
    pub fn relative(&self) -> String {
        format!("{}/{TASKS}/{}", self.collector, self.task)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{INFRA_USAGE}/{}/{TASKS}/{}",
            self.orchestrator, self.collector, self.task
        )
    }
}

impl FromStr for QueryId {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for QueryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QueryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Path part of an href that may be absolute (`http://host/...`) or relative.
fn href_path(href: &str) -> String {
    Url::parse(href).map_or_else(|_| href.to_string(), |url| url.path().to_string())
}

/// Split a path on `/` and percent-decode each segment.
fn decode_segments(path: &str) -> Option<Vec<String>> {
    path.split('/')
        .map(|segment| urlencoding::decode(segment).ok().map(|s| s.into_owned()))
        .collect()
}

/// Extract the query id from a `Location` header.
pub(crate) fn query_id_from_location(location: &str, api_prefix: &str) -> Result<QueryId> {
    let location = location.trim();
    if location.is_empty() {
        return Err(UsageError::Protocol(
            "query created but the Location header is empty".to_string(),
        ));
    }

    let path = href_path(location);
    let marker = format!("{api_prefix}/orchestrators/");
    let reference = path.strip_prefix(&marker).ok_or_else(|| {
        UsageError::Protocol(format!(
            "Location '{location}' does not start with {marker}"
        ))
    })?;
    let segments = decode_segments(reference).ok_or_else(|| {
        UsageError::Protocol(format!("Location '{location}' is not valid UTF-8 once decoded"))
    })?;
    let parts: Vec<&str> = segments.iter().map(String::as_str).collect();
    match parts.as_slice() {
        [orchestrator, INFRA_USAGE, collector, TASKS, task] => {
            QueryId::new(*orchestrator, *collector, *task)
        }
        _ => QueryId::parse(reference),
    }
}

/// Query id of a task href from an orchestrator listing, `None` if it does not fit.
pub(crate) fn query_id_from_task(href: &str, orchestrator: &str, api_prefix: &str) -> Option<QueryId> {
    let path = href_path(href);
    let marker = format!("{api_prefix}/orchestrators/");
    let rest = path.strip_prefix(&marker).unwrap_or(&path);
    let segments = decode_segments(rest.trim_start_matches('/'))?;

    let parts: Vec<&str> = segments.iter().map(String::as_str).collect();
    match parts.as_slice() {
        [o, INFRA_USAGE, collector, TASKS, task] if *o == orchestrator => {
            QueryId::new(orchestrator, *collector, *task).ok()
        }
        _ => None,
    }
}

// =============================================================================
// Polling policy
// =============================================================================

/// How a caller waits for a query to finish.
///
/// The default polls every second with no cap, which blocks forever on a
/// query the server never finishes. Set `max_attempts` to bound the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between two status calls.
    pub interval: Duration,
    /// Maximum number of status calls, `None` for unbounded.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}

/// A query that reached a terminal status and was deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedQuery {
    pub id: QueryId,
    #[serde(flatten)]
    pub collection: UsageCollection,
}

// =============================================================================
// Lifecycle operations
// =============================================================================

/// Usage collection queries of the service.
#[derive(Debug, Clone, Copy)]
pub struct Queries<'a> {
    transport: &'a Transport,
}

impl<'a> Queries<'a> {
    #[must_use]
    pub const fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// Submit a usage collection query on a location.
    ///
    /// `params` become URL query parameters (e.g. `start`, `end`, `user`);
    /// on duplicate keys the last value wins.
    ///
    /// # Errors
    ///
    /// [`UsageError::HttpStatus`] unless the gateway answers 201,
    /// [`UsageError::Protocol`] when the Location header is missing or malformed.
    pub async fn submit<I, K, V>(
        &self,
        orchestrator: &str,
        collector: &str,
        location: &str,
        params: I,
    ) -> Result<QueryId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params: BTreeMap<String, String> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut path = self.transport.api_segments(&[
            "orchestrators",
            orchestrator,
            INFRA_USAGE,
            collector,
            location,
        ]);
        if !params.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&params)
                .finish();
            path.push('?');
            path.push_str(&query);
        }

        let response = self
            .transport
            .send(Method::POST, &path, None, HeaderMap::new())
            .await?;
        let response = expect_status(response, StatusCode::CREATED).await?;

        let location_header = match response.headers().get(LOCATION) {
            Some(value) => value.to_str().map_err(|_| {
                UsageError::Protocol("query created but the Location header is not text".into())
            })?,
            None => {
                return Err(UsageError::Protocol(
                    "query created but the response has no Location header".to_string(),
                ));
            }
        };
        let id = query_id_from_location(location_header, self.transport.api_prefix())?;

        tracing::info!(query = %id, "usage collection query submitted");
        Ok(id)
    }

    fn resource_path(&self, id: &QueryId) -> String {
        self.transport.api_segments(&[
            "orchestrators",
            id.orchestrator(),
            INFRA_USAGE,
            id.collector(),
            TASKS,
            id.task(),
        ])
    }

    /// Current status, and results once DONE. Side-effect free.
    ///
    /// # Errors
    ///
    /// [`UsageError::HttpStatus`] unless the gateway answers 200, or a decode error.
    pub async fn status(&self, id: &QueryId) -> Result<UsageCollection> {
        let path = self.resource_path(id);
        let response = self
            .transport
            .send(Method::GET, &path, None, HeaderMap::new())
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;
        let envelope: DataEnvelope<UsageCollection> =
            read_json(response, &format!("status of query {id}")).await?;
        Ok(envelope.data)
    }

    /// Delete a query and its results.
    ///
    /// Nothing stops deleting a query that is still running; what that does is
    /// up to the server.
    ///
    /// # Errors
    ///
    /// [`UsageError::HttpStatus`] unless the gateway answers 200.
    pub async fn delete(&self, id: &QueryId) -> Result<()> {
        let path = self.resource_path(id);
        let response = self
            .transport
            .send(Method::DELETE, &path, None, HeaderMap::new())
            .await?;
        expect_status(response, StatusCode::OK).await?;
        tracing::info!(query = %id, "usage collection query deleted");
        Ok(())
    }

    /// Queries known on an orchestrator, optionally only those of one collector.
    ///
    /// An empty `collector` returns every query. Task links that do not have
    /// the `<collector>/tasks/<id>` shape are skipped.
    ///
    /// # Errors
    ///
    /// Transport errors are propagated, any status but 200 is
    /// [`UsageError::HttpStatus`], and a malformed envelope is a decode error.
    pub async fn list_ids(&self, orchestrator: &str, collector: &str) -> Result<Vec<QueryId>> {
        let path = self
            .transport
            .api_segments(&["orchestrators", orchestrator, INFRA_USAGE]);
        let response = self
            .transport
            .send(Method::GET, &path, None, HeaderMap::new())
            .await?;
        let response = expect_status(response, StatusCode::OK).await?;
        let envelope: DataEnvelope<TaskList> =
            read_json(response, &format!("query list of {orchestrator}")).await?;

        let mut ids = Vec::new();
        for task in envelope.data.tasks {
            match query_id_from_task(&task.href, orchestrator, self.transport.api_prefix()) {
                Some(id) if collector.is_empty() || id.collector() == collector => ids.push(id),
                Some(_) => {}
                None => {
                    tracing::warn!(
                        href = %task.href,
                        "skipping task, expected <collector ID>/tasks/<query ID>"
                    );
                }
            }
        }
        Ok(ids)
    }

    /// Poll `status` until the query is DONE, FAILED or CANCELED.
    ///
    /// Statuses outside the known set are reported as-is and keep the loop
    /// going.
    ///
    /// # Errors
    ///
    /// The first failing status call, or [`UsageError::PollLimitExceeded`]
    /// once `policy.max_attempts` calls returned a non-terminal status.
    pub async fn wait_for_completion(
        &self,
        id: &QueryId,
        policy: &PollPolicy,
    ) -> Result<UsageCollection> {
        let mut attempts: u32 = 0;
        let mut previous: Option<QueryStatus> = None;

        loop {
            let collection = self.status(id).await?;
            attempts += 1;

            if let Some(prev) = &previous {
                if prev.regresses_to(&collection.status) {
                    tracing::warn!(
                        query = %id,
                        from = %prev,
                        to = %collection.status,
                        "query status moved backwards"
                    );
                }
            }
            if previous.as_ref() != Some(&collection.status) {
                tracing::debug!(query = %id, status = %collection.status, attempts, "query status");
            }

            if collection.status.is_terminal() {
                return Ok(collection);
            }
            if policy.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(UsageError::PollLimitExceeded {
                    query_id: id.to_string(),
                    attempts,
                });
            }

            previous = Some(collection.status);
            tokio::time::sleep(policy.interval).await;
        }
    }

    /// Submit, wait for a terminal status, then delete the query once.
    ///
    /// If waiting fails the query is still deleted on a best-effort basis and
    /// the waiting error is returned.
    ///
    /// # Errors
    ///
    /// Any error of `submit`, `wait_for_completion` or `delete`.
    pub async fn run_to_completion<I, K, V>(
        &self,
        orchestrator: &str,
        collector: &str,
        location: &str,
        params: I,
        policy: &PollPolicy,
    ) -> Result<CompletedQuery>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let id = self
            .submit(orchestrator, collector, location, params)
            .await?;

        match self.wait_for_completion(&id, policy).await {
            Ok(collection) => {
                self.delete(&id).await?;
                Ok(CompletedQuery { id, collection })
            }
            Err(err) => {
                if let Err(delete_err) = self.delete(&id).await {
                    tracing::warn!(query = %id, error = %delete_err, "failed to delete query");
                }
                Err(err)
            }
        }
    }
}
