//! Error rendering.
//!
//! Colored output with fix suggestions on a terminal, a one-line summary
//! otherwise, and a structured JSON object in robot mode.

use colored::Colorize;

use crate::cli::args::OutputFormat;
use crate::error::{FixSuggestion, UsageError};

// =============================================================================
// Public API
// =============================================================================

/// Render an error for stderr.
///
/// Rich output is used only for the human format, with colors enabled and
/// stderr attached to a terminal.
#[must_use]
pub fn render_error(error: &UsageError, format: OutputFormat, no_color: bool, pretty: bool) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Human => {
            if !no_color && crate::util::env::stderr_is_tty() {
                render_rich(error)
            } else {
                render_simple(error)
            }
        }
    }
}

/// Render error as structured JSON for machine consumption.
#[must_use]
pub fn render_error_json(error: &UsageError, pretty: bool) -> String {
    let error_json = ErrorJson::from_error(error);
    let rendered = if pretty {
        serde_json::to_string_pretty(&error_json)
    } else {
        serde_json::to_string(&error_json)
    };
    rendered.unwrap_or_else(|_| render_simple(error))
}

// =============================================================================
// Terminal Rendering
// =============================================================================

fn render_rich(error: &UsageError) -> String {
    let suggestions = error.fix_suggestions();
    let mut lines = vec![format!(
        "{} {}",
        error.to_string().red().bold(),
        format!("[{}]", error.error_code()).dimmed()
    )];

    if !suggestions.is_empty() {
        lines.push(String::new());
        lines.push(render_suggestions_section(&suggestions));
    }

    if let Some(suggestion) = suggestions.first() {
        if !suggestion.context.is_empty() {
            lines.push(String::new());
            lines.push("Why this happened:".yellow().to_string());
            lines.extend(wrap_text(&suggestion.context, 70).into_iter().map(|l| format!("  {l}")));
        }
        if let Some(prevention) = &suggestion.prevention {
            lines.push(String::new());
            lines.push("Prevention:".green().to_string());
            lines.extend(wrap_text(prevention, 70).into_iter().map(|l| format!("  {l}")));
        }
    }

    lines.join("\n")
}

fn render_suggestions_section(suggestions: &[FixSuggestion]) -> String {
    let mut lines = vec!["How to fix:".bold().to_string()];
    for (i, suggestion) in suggestions.iter().enumerate() {
        for (j, cmd) in suggestion.commands.iter().enumerate() {
            let prefix = if j == 0 {
                format!("  {}. ", i + 1)
            } else {
                "     Or: ".to_string()
            };
            lines.push(format!("{prefix}{}", cmd.cyan()));
        }
    }
    lines.join("\n")
}

/// Render error as simple text (no ANSI codes).
fn render_simple(error: &UsageError) -> String {
    let mut lines = vec![format!("Error [{}]: {error}", error.error_code())];

    let first_command = error
        .fix_suggestions()
        .into_iter()
        .flat_map(|s| s.commands)
        .find(|cmd| !cmd.starts_with('#'));
    if let Some(cmd) = first_command {
        lines.push(format!("Fix: {cmd}"));
    }

    lines.join("\n")
}

// =============================================================================
// JSON Rendering
// =============================================================================

#[derive(serde::Serialize)]
struct ErrorJson {
    error_code: String,
    category: String,
    message: String,
    is_retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_status: Option<u16>,
    suggestions: Vec<FixSuggestion>,
}

impl ErrorJson {
    fn from_error(error: &UsageError) -> Self {
        Self {
            error_code: error.error_code().to_string(),
            category: error.category().to_string(),
            message: error.to_string(),
            is_retryable: error.is_retryable(),
            http_status: error.http_status(),
            suggestions: error.fix_suggestions(),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }
    lines
}
