//! Fix suggestions for infra-usage errors.
//!
//! Maps error variants to commands the user can run and a short explanation
//! of what the gateway or the client observed.

use serde::Serialize;

// =============================================================================
// Fix Suggestion Types
// =============================================================================

/// A fix suggestion for an error.
#[derive(Debug, Clone, Serialize)]
pub struct FixSuggestion {
    /// Commands to try, copy-paste ready.
    pub commands: Vec<String>,

    /// Explanation of why this error occurred.
    pub context: String,

    /// Tips to prevent this error in the future.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prevention: Option<String>,
}

impl FixSuggestion {
    /// Creates a new fix suggestion with required fields.
    #[must_use]
    pub fn new(commands: Vec<String>, context: impl Into<String>) -> Self {
        Self {
            commands,
            context: context.into(),
            prevention: None,
        }
    }

    /// Builder: adds prevention tips.
    #[must_use]
    pub fn with_prevention(mut self, prevention: impl Into<String>) -> Self {
        self.prevention = Some(prevention.into());
        self
    }
}

// =============================================================================
// Suggestion Generators
// =============================================================================

/// Login rejected by the gateway.
#[must_use]
pub fn auth_suggestions(message: &str) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![
                "infra-usage --user <user> --password <password> orchestrators".to_string(),
                "export INFRA_USAGE_USER=<user> INFRA_USAGE_PASSWORD=<password>".to_string(),
            ],
            format!("The gateway refused the credentials ({message})."),
        )
        .with_prevention("Keep credentials in the config file instead of shell history."),
    ]
}

/// The request never got an HTTP answer.
#[must_use]
pub fn transport_suggestions(message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["infra-usage --url <gateway-url> orchestrators".to_string()],
        format!(
            "Could not reach the gateway: {message}. Check the URL, the network, \
             and the TLS settings (--ca-file or --insecure for https)."
        ),
    )]
}

/// Timed out waiting for an HTTP answer.
#[must_use]
pub fn timeout_suggestions(seconds: u64) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec!["# Raise [gateway] timeout_seconds in config.toml".to_string()],
            format!("The gateway did not answer within {seconds} seconds."),
        )
        .with_prevention("Large collections may need a longer request timeout."),
    ]
}

/// The gateway answered with a non-success status.
#[must_use]
pub fn http_status_suggestions(status: u16, message: &str) -> Vec<FixSuggestion> {
    let context = match status {
        403 => "Access denied even after logging in again. The user may lack the \
                rights to use usage collectors."
            .to_string(),
        404 => format!("Resource not found: {message}. Check orchestrator, collector and query ids."),
        500..=599 => format!("The service failed internally: {message}. Retry later."),
        _ => format!("The service answered HTTP {status}: {message}"),
    };
    vec![FixSuggestion::new(
        vec!["infra-usage -v orchestrators".to_string()],
        context,
    )]
}

/// The body did not match the expected JSON envelope.
#[must_use]
pub fn decode_suggestions(context: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["infra-usage --log-level debug orchestrators".to_string()],
        format!(
            "The {context} response did not match the expected envelope. \
             The API prefix may point at a different plugin version."
        ),
    )]
}

/// The polling cap was reached before a terminal status.
#[must_use]
pub fn poll_limit_suggestions(query_id: &str, attempts: u32) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![
                format!("infra-usage status {query_id}"),
                format!("infra-usage delete {query_id}"),
            ],
            format!("The query was still running after {attempts} status checks."),
        )
        .with_prevention("Raise --max-attempts or the poll interval for long collections."),
    ]
}

/// The collector gave up on the query.
#[must_use]
pub fn query_unsuccessful_suggestions(query_id: &str, status: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![format!("infra-usage status {query_id}")],
        format!(
            "The usage collector reported {status}. Its logs on the orchestrator usually say why."
        ),
    )]
}

/// Ctrl-C while waiting for a query.
#[must_use]
pub fn interrupted_suggestions() -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![
                "infra-usage queries --orchestrator <name>".to_string(),
                "infra-usage status <query-id>".to_string(),
                "infra-usage delete <query-id>".to_string(),
            ],
            "The wait was stopped before the query finished. The query was deleted on a \
             best-effort basis; if that failed it is still listed on the orchestrator.",
        )
        .with_prevention("Use --max-attempts to bound the wait instead of interrupting it."),
    ]
}

/// The gateway broke the query lifecycle contract.
#[must_use]
pub fn protocol_suggestions(message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["infra-usage --log-level debug queries --orchestrator <name>".to_string()],
        format!("Unexpected answer from the gateway: {message}."),
    )]
}

/// Invalid configuration value.
#[must_use]
pub fn config_invalid_suggestions(key: &str, value: &str, message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![format!("# Fix '{key}' in config.toml or the matching flag")],
        format!("'{value}' is not a valid value for {key}: {message}"),
    )]
}

/// Unknown orchestrator name.
#[must_use]
pub fn orchestrator_not_found_suggestions(name: &str, known: &[String]) -> Vec<FixSuggestion> {
    let mut commands = vec!["infra-usage orchestrators".to_string()];
    commands.extend(
        known
            .iter()
            .map(|k| format!("infra-usage collectors --orchestrator {k}")),
    );
    vec![FixSuggestion::new(
        commands,
        format!("Orchestrator '{name}' is not configured on the service."),
    )]
}

/// Unknown collector for an orchestrator.
#[must_use]
pub fn collector_not_found_suggestions(orchestrator: &str, collector: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![format!("infra-usage collectors --orchestrator {orchestrator}")],
        format!("No usage collector '{collector}' is registered on '{orchestrator}'."),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_status_mentions_relogin() {
        let s = http_status_suggestions(403, "");
        assert!(s[0].context.contains("logging in again"));
    }

    #[test]
    fn orchestrator_suggestions_include_known_names() {
        let s = orchestrator_not_found_suggestions("x", &["yorc".to_string()]);
        assert!(
            s[0].commands
                .contains(&"infra-usage collectors --orchestrator yorc".to_string())
        );
    }

    #[test]
    fn poll_limit_suggests_status_and_delete() {
        let s = poll_limit_suggestions("o/infra_usage/c/tasks/q", 10);
        assert_eq!(s[0].commands.len(), 2);
        assert!(s[0].prevention.is_some());
    }

    #[test]
    fn interrupted_points_at_leftover_queries() {
        let s = interrupted_suggestions();
        assert!(s[0].commands.iter().any(|c| c.starts_with("infra-usage status")));
        assert!(s[0].commands.iter().any(|c| c.starts_with("infra-usage delete")));
    }
}
