//! Human-readable output using colored.

use colored::{ColoredString, Colorize};
use serde_json::Value;

use crate::core::models::{Orchestrator, QueryStatus, UsageCollection, UsageCollector};
use crate::core::query::QueryId;

/// Apply `style` unless colors are off.
fn paint(text: &str, no_color: bool, style: impl Fn(&str) -> ColoredString) -> String {
    if no_color {
        text.to_string()
    } else {
        style(text).to_string()
    }
}

/// Color of a query status.
fn status_label(status: &QueryStatus, no_color: bool) -> String {
    let text = status.as_str();
    match status {
        QueryStatus::Done => paint(text, no_color, |t| t.green().bold()),
        QueryStatus::Failed => paint(text, no_color, |t| t.red().bold()),
        QueryStatus::Canceled => paint(text, no_color, |t| t.yellow().bold()),
        QueryStatus::Initial | QueryStatus::Running => paint(text, no_color, |t| t.cyan()),
        QueryStatus::Other(_) => paint(text, no_color, |t| t.magenta()),
    }
}

/// Left-aligned two column rows.
fn rows(pairs: &[(String, String)], no_color: bool) -> String {
    let width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (key, value) in pairs {
        let padded = format!("{key:<width$}");
        out.push_str(&format!(
            "  {}  {}\n",
            paint(&padded, no_color, |t| t.bold()),
            paint(value, no_color, |t| t.dimmed())
        ));
    }
    out
}

fn heading(text: &str, no_color: bool) -> String {
    format!("{}\n", paint(text, no_color, |t| t.bold().underline()))
}

pub fn render_orchestrators(orchestrators: &[Orchestrator], no_color: bool) -> String {
    if orchestrators.is_empty() {
        return "No orchestrators configured.\n".to_string();
    }
    let pairs: Vec<_> = orchestrators
        .iter()
        .map(|o| (o.name.clone(), o.href.clone()))
        .collect();
    format!("{}{}", heading("Orchestrators", no_color), rows(&pairs, no_color))
}

pub fn render_collectors(
    orchestrator: &str,
    collectors: &[UsageCollector],
    no_color: bool,
) -> String {
    if collectors.is_empty() {
        return format!("No usage collectors registered on {orchestrator}.\n");
    }
    let pairs: Vec<_> = collectors
        .iter()
        .map(|c| (c.id.clone(), c.origin.clone()))
        .collect();
    format!(
        "{}{}",
        heading(&format!("Usage collectors on {orchestrator}"), no_color),
        rows(&pairs, no_color)
    )
}

pub fn render_queries(orchestrator: &str, ids: &[QueryId], no_color: bool) -> String {
    if ids.is_empty() {
        return format!("No usage collection queries on {orchestrator}.\n");
    }
    let mut out = heading(&format!("Queries on {orchestrator}"), no_color);
    for id in ids {
        out.push_str(&format!("  {id}\n"));
    }
    out
}

/// Inline form of a result value: strings unquoted, everything else as JSON.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Status line followed by the result set, if any.
pub fn render_collection(id: &QueryId, collection: &UsageCollection, no_color: bool) -> String {
    let mut out = heading(&format!("Query {id}"), no_color);
    out.push_str(&format!(
        "  Status: {}\n",
        status_label(&collection.status, no_color)
    ));

    if !collection.result_set.is_empty() {
        out.push_str(&format!("\n{}", heading("Results", no_color)));
        let pairs: Vec<_> = collection
            .result_set
            .iter()
            .map(|(k, v)| (k.clone(), value_text(v)))
            .collect();
        out.push_str(&rows(&pairs, no_color));
    }
    out
}

pub fn render_deleted(id: &QueryId, no_color: bool) -> String {
    format!("{} {id}\n", paint("Deleted", no_color, |t| t.green()))
}

/// Key, value and source rows.
pub fn render_settings(rows_in: &[(&str, String, String)], no_color: bool) -> String {
    let key_width = rows_in.iter().map(|(k, _, _)| k.len()).max().unwrap_or(0);
    let value_width = rows_in.iter().map(|(_, v, _)| v.len()).max().unwrap_or(0);
    let mut out = heading("Configuration", no_color);
    for (key, value, source) in rows_in {
        let key = format!("{key:<key_width$}");
        let value = format!("{value:<value_width$}");
        out.push_str(&format!(
            "  {}  {}  {}\n",
            paint(&key, no_color, |t| t.bold()),
            value,
            paint(&format!("({source})"), no_color, |t| t.dimmed())
        ));
    }
    out
}
