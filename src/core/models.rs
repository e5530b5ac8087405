//! Data models exchanged with the usage collection gateway.
//!
//! Every object here is a read-only snapshot of server state. Nothing is
//! cached client-side.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Directory entries
// =============================================================================

/// An orchestrator configured on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orchestrator {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub href: String,
}

/// A usage collector plugin registered on one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCollector {
    #[serde(default)]
    pub id: String,
    /// Identifier of the plugin providing this collector.
    #[serde(default)]
    pub origin: String,
}

// =============================================================================
// Query status
// =============================================================================

/// Server-side state of a usage collection query.
///
/// Unknown strings are kept verbatim in [`QueryStatus::Other`] so callers see
/// exactly what the server sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QueryStatus {
    Initial,
    Running,
    Done,
    Failed,
    Canceled,
    Other(String),
}

impl QueryStatus {
    pub const INITIAL: &'static str = "INITIAL";
    pub const RUNNING: &'static str = "RUNNING";
    pub const DONE: &'static str = "DONE";
    pub const FAILED: &'static str = "FAILED";
    pub const CANCELED: &'static str = "CANCELED";

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initial => Self::INITIAL,
            Self::Running => Self::RUNNING,
            Self::Done => Self::DONE,
            Self::Failed => Self::FAILED,
            Self::Canceled => Self::CANCELED,
            Self::Other(s) => s,
        }
    }

    /// DONE, FAILED and CANCELED never change until the query is deleted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Canceled)
    }

    /// Position in INITIAL -> RUNNING -> terminal, `None` for unknown states.
    #[must_use]
    pub const fn rank(&self) -> Option<u8> {
        match self {
            Self::Initial => Some(0),
            Self::Running => Some(1),
            Self::Done | Self::Failed | Self::Canceled => Some(2),
            Self::Other(_) => None,
        }
    }

    /// True when going from `self` to `next` moves backwards in the lifecycle.
    #[must_use]
    pub fn regresses_to(&self, next: &Self) -> bool {
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to < from || (self.is_terminal() && self != next),
            _ => false,
        }
    }
}

impl From<String> for QueryStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            Self::INITIAL => Self::Initial,
            Self::RUNNING => Self::Running,
            Self::DONE => Self::Done,
            Self::FAILED => Self::Failed,
            Self::CANCELED => Self::Canceled,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for QueryStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<QueryStatus> for String {
    fn from(status: QueryStatus) -> Self {
        match status {
            QueryStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Collection results
// =============================================================================

/// Status of a query and, once DONE, the collected usage.
///
/// The result set belongs to the collector plugin; it is passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageCollection {
    pub status: QueryStatus,
    #[serde(default, alias = "results")]
    pub result_set: Map<String, Value>,
}

// =============================================================================
// Wire envelopes
// =============================================================================

/// `{ "data": ... }` wrapper used by every successful response.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OrchestratorList {
    #[serde(default)]
    pub orchestrators: Vec<Orchestrator>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CollectorList {
    #[serde(default)]
    pub infrastructures: Vec<UsageCollector>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TaskList {
    #[serde(default)]
    pub tasks: Vec<TaskLink>,
}

/// Link to one query in a task listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TaskLink {
    #[serde(default)]
    pub href: String,
}

/// `{ "error": { "code": ..., "message": ... } }` body of failed calls.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub error: ApiError,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// Robot output
// =============================================================================

/// Stable JSON envelope printed by `--format json`.
#[derive(Debug, Clone, Serialize)]
pub struct RobotOutput<T> {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,
}

impl<T> RobotOutput<T> {
    /// Create a new robot output envelope.
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self {
            schema_version: "infra-usage.v1".to_string(),
            generated_at: Utc::now(),
            command: command.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_envelope_decodes_result_set() {
        let body = json!({"data": {"status": "DONE", "result_set": {"cpu": 42}}});
        let env: DataEnvelope<UsageCollection> = serde_json::from_value(body).unwrap();

        let mut expected = Map::new();
        expected.insert("cpu".into(), json!(42));
        assert_eq!(
            env.data,
            UsageCollection {
                status: QueryStatus::Done,
                result_set: expected,
            }
        );
    }

    #[test]
    fn missing_result_set_stays_empty() {
        let env: DataEnvelope<UsageCollection> =
            serde_json::from_value(json!({"data": {"status": "RUNNING"}})).unwrap();
        assert_eq!(env.data.status, QueryStatus::Running);
        assert!(env.data.result_set.is_empty());
    }

    #[test]
    fn legacy_results_key_is_accepted() {
        let env: DataEnvelope<UsageCollection> = serde_json::from_value(
            json!({"data": {"status": "DONE", "results": {"hours": 3}}}),
        )
        .unwrap();
        assert_eq!(env.data.result_set["hours"], json!(3));
    }

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let status = QueryStatus::from("PAUSED");
        assert_eq!(status, QueryStatus::Other("PAUSED".into()));
        assert_eq!(status.to_string(), "PAUSED");
        assert!(!status.is_terminal());
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("PAUSED"));
    }

    #[test]
    fn terminal_states() {
        assert!(QueryStatus::Done.is_terminal());
        assert!(QueryStatus::Failed.is_terminal());
        assert!(QueryStatus::Canceled.is_terminal());
        assert!(!QueryStatus::Initial.is_terminal());
        assert!(!QueryStatus::Running.is_terminal());
    }

    #[test]
    fn regressions_are_detected() {
        assert!(QueryStatus::Running.regresses_to(&QueryStatus::Initial));
        assert!(QueryStatus::Done.regresses_to(&QueryStatus::Failed));
        assert!(!QueryStatus::Initial.regresses_to(&QueryStatus::Running));
        assert!(!QueryStatus::Running.regresses_to(&QueryStatus::Other("X".into())));
        assert!(!QueryStatus::Done.regresses_to(&QueryStatus::Done));
    }

    #[test]
    fn error_envelope_tolerates_missing_fields() {
        let env: ErrorEnvelope = serde_json::from_str("{}").unwrap();
        assert_eq!(env.error.message, "");
        assert_eq!(env.error.code, None);

        let env: ErrorEnvelope =
            serde_json::from_str(r#"{"error":{"code":404,"message":"gone"}}"#).unwrap();
        assert_eq!(env.error.code, Some(404));
        assert_eq!(env.error.message, "gone");
    }

    #[test]
    fn missing_arrays_decode_as_empty() {
        let env: DataEnvelope<OrchestratorList> =
            serde_json::from_value(json!({"data": {}})).unwrap();
        assert!(env.data.orchestrators.is_empty());
    }
}
