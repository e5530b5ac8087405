//! Error types for infra-usage.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into six main categories:
//! - **Authentication**: the gateway rejected the login
//! - **Network**: connection, timeout, DNS, or TLS issues
//! - **Configuration**: config file, flags, unknown orchestrator or collector
//! - **Service**: non-success HTTP statuses and undecodable envelopes
//! - **Protocol**: the gateway broke the query lifecycle contract
//! - **Internal**: unexpected errors, bugs, or unclassified issues
//!
//! Each error has a stable error code (e.g., `IU-A001`) for programmatic handling.

pub mod suggestions;

use thiserror::Error;

pub use suggestions::FixSuggestion;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Login rejected by the gateway.
    Authentication,
    /// Network issues (timeout, DNS, TLS, connection refused).
    Network,
    /// Configuration issues (parse errors, invalid values, unknown names).
    Configuration,
    /// The remote service answered with an error or an unexpected body.
    Service,
    /// The remote service violated the query lifecycle protocol.
    Protocol,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Network => "Network error",
            Self::Configuration => "Configuration error",
            Self::Service => "Service error",
            Self::Protocol => "Protocol error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Authentication => "A",
            Self::Network => "N",
            Self::Configuration => "C",
            Self::Service => "S",
            Self::Protocol => "R",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes of the `infra-usage` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure, or a query that ended FAILED/CANCELED
    GeneralError = 1,
    /// Unknown orchestrator or collector
    NotFound = 2,
    /// Configuration, decode and protocol errors
    ParseError = 3,
    /// Timeout or polling cap reached
    Timeout = 4,
    /// Login rejected
    AuthError = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Main error type for infra-usage operations.
#[derive(Error, Debug)]
pub enum UsageError {
    // ==========================================================================
    // Authentication errors (Category: Authentication)
    // ==========================================================================
    /// The gateway rejected the credentials.
    #[error("login rejected: {message}")]
    Auth { message: String },

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// The request could not be sent or the response could not be read.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Request timed out after specified duration.
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    // ==========================================================================
    // Service errors (Category: Service)
    // ==========================================================================
    /// Non-success HTTP status, with the message of the error envelope.
    #[error("HTTP {status}: {message}")]
    HttpStatus {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// The response body does not match the expected envelope.
    #[error("cannot decode {context}: {message}")]
    Decode { context: String, message: String },

    /// The query did not reach a terminal status within the polling cap.
    #[error("query {query_id} still not finished after {attempts} status checks")]
    PollLimitExceeded { query_id: String, attempts: u32 },

    /// The query finished FAILED or CANCELED.
    #[error("query {query_id} ended {status}")]
    QueryUnsuccessful { query_id: String, status: String },

    // ==========================================================================
    // Protocol errors (Category: Protocol)
    // ==========================================================================
    /// Missing Location header, foreign prefix, malformed query id.
    #[error("protocol error: {0}")]
    Protocol(String),

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    /// No orchestrator with that name is configured on the service.
    #[error("no orchestrator {name} found, known orchestrators: {}", known.join(", "))]
    OrchestratorNotFound { name: String, known: Vec<String> },

    /// No usage collector with that id is registered on the orchestrator.
    #[error("found no collector for {collector} on orchestrator {orchestrator}")]
    CollectorNotFound {
        orchestrator: String,
        collector: String,
    },

    // ==========================================================================
    // I/O errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stopped by the user before the query finished.
    #[error("interrupted")]
    Interrupted,

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UsageError {
    /// Build a decode error for a response of the given kind.
    pub fn decode(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Map a `reqwest` failure onto the network variants.
    #[must_use]
    pub fn from_reqwest(err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_secs)
        } else {
            Self::Transport {
                message: err.to_string(),
            }
        }
    }

    /// Map error to the process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::OrchestratorNotFound { .. } | Self::CollectorNotFound { .. } => {
                ExitCode::NotFound
            }

            Self::Config(_)
            | Self::ConfigInvalid { .. }
            | Self::Decode { .. }
            | Self::Protocol(_) => ExitCode::ParseError,

            Self::Timeout(_) | Self::PollLimitExceeded { .. } => ExitCode::Timeout,

            Self::Auth { .. } => ExitCode::AuthError,

            Self::Transport { .. }
            | Self::HttpStatus { .. }
            | Self::QueryUnsuccessful { .. }
            | Self::Interrupted
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Auth { .. } => ErrorCategory::Authentication,

            Self::Transport { .. } | Self::Timeout(_) => ErrorCategory::Network,

            Self::Config(_)
            | Self::ConfigInvalid { .. }
            | Self::OrchestratorNotFound { .. }
            | Self::CollectorNotFound { .. } => ErrorCategory::Configuration,

            Self::HttpStatus { .. }
            | Self::Decode { .. }
            | Self::PollLimitExceeded { .. }
            | Self::QueryUnsuccessful { .. } => ErrorCategory::Service,

            Self::Protocol(_) => ErrorCategory::Protocol,

            Self::Interrupted | Self::Io(_) | Self::Json(_) | Self::Other(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `IU-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "IU-A001",

            Self::Timeout(_) => "IU-N001",
            Self::Transport { .. } => "IU-N099",

            Self::Config(_) => "IU-C001",
            Self::ConfigInvalid { .. } => "IU-C002",
            Self::OrchestratorNotFound { .. } => "IU-C010",
            Self::CollectorNotFound { .. } => "IU-C011",

            Self::HttpStatus { .. } => "IU-S001",
            Self::Decode { .. } => "IU-S010",
            Self::PollLimitExceeded { .. } => "IU-S020",
            Self::QueryUnsuccessful { .. } => "IU-S030",

            Self::Protocol(_) => "IU-R001",

            Self::Io(_) => "IU-X001",
            Self::Json(_) => "IU-X002",
            Self::Interrupted => "IU-X010",
            Self::Other(_) => "IU-X099",
        }
    }

    /// Returns whether the caller may reasonably retry the operation.
    ///
    /// The library itself never retries; this only informs callers.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport { .. } | Self::PollLimitExceeded { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the HTTP status if the gateway answered with an error.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns actionable fix suggestions for this error.
    #[must_use]
    pub fn fix_suggestions(&self) -> Vec<FixSuggestion> {
        match self {
            Self::Auth { message } => suggestions::auth_suggestions(message),
            Self::Transport { message } => suggestions::transport_suggestions(message),
            Self::Timeout(seconds) => suggestions::timeout_suggestions(*seconds),
            Self::HttpStatus {
                status, message, ..
            } => suggestions::http_status_suggestions(*status, message),
            Self::Decode { context, .. } => suggestions::decode_suggestions(context),
            Self::PollLimitExceeded {
                query_id,
                attempts,
            } => suggestions::poll_limit_suggestions(query_id, *attempts),
            Self::QueryUnsuccessful { query_id, status } => {
                suggestions::query_unsuccessful_suggestions(query_id, status)
            }
            Self::Protocol(message) => suggestions::protocol_suggestions(message),
            Self::Config(message) => vec![FixSuggestion::new(
                vec!["infra-usage --help".to_string()],
                format!("Configuration error: {message}"),
            )],
            Self::ConfigInvalid {
                key,
                value,
                message,
            } => suggestions::config_invalid_suggestions(key, value, message),
            Self::OrchestratorNotFound { name, known } => {
                suggestions::orchestrator_not_found_suggestions(name, known)
            }
            Self::CollectorNotFound {
                orchestrator,
                collector,
            } => suggestions::collector_not_found_suggestions(orchestrator, collector),
            Self::Interrupted => suggestions::interrupted_suggestions(),
            Self::Io(err) => vec![FixSuggestion::new(
                vec!["# Check file permissions and disk space".to_string()],
                format!("I/O error: {err}."),
            )],
            Self::Json(err) => vec![FixSuggestion::new(
                Vec::new(),
                format!("JSON error: {err}. The data may be in an unexpected format."),
            )],
            Self::Other(err) => vec![FixSuggestion::new(
                Vec::new(),
                format!("Unexpected error: {err}. Please report this issue."),
            )],
        }
    }
}

/// Result type alias for infra-usage operations.
pub type Result<T> = std::result::Result<T, UsageError>;

// =============================================================================
// Tests
// =============================================================================
