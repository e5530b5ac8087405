//! `config show` and `config init` commands.

use serde::Serialize;
use serde_json::json;

use super::args::{ConfigCommand, OutputFormat};
use super::directory::print_output;
use crate::error::Result;
use crate::render::{OutputOptions, human};
use crate::storage::{Config, ConfigSources, ResolvedConfig};

const REDACTED: &str = "********";

/// Resolved settings as printed by `config show`. The password is never shown.
#[derive(Debug, Serialize)]
struct ConfigView<'a> {
    config_path: String,
    url: &'a str,
    user: &'a str,
    password: &'static str,
    api_prefix: &'a str,
    ca_file: Option<String>,
    insecure: bool,
    timeout_seconds: u64,
    poll_interval_ms: u128,
    max_attempts: Option<u32>,
    format: &'static str,
    pretty: bool,
    no_color: bool,
    sources: &'a ConfigSources,
}

impl<'a> ConfigView<'a> {
    fn new(config: &'a ResolvedConfig) -> Self {
        Self {
            config_path: config.config_path.display().to_string(),
            url: &config.url,
            user: &config.user,
            password: REDACTED,
            api_prefix: &config.api_prefix,
            ca_file: config.tls.ca_file.as_ref().map(|p| p.display().to_string()),
            insecure: config.tls.insecure,
            timeout_seconds: config.timeout.as_secs(),
            poll_interval_ms: config.poll.interval.as_millis(),
            max_attempts: config.poll.max_attempts,
            format: match config.format {
                OutputFormat::Human => "human",
                OutputFormat::Json => "json",
            },
            pretty: config.pretty,
            no_color: config.no_color,
            sources: &config.sources,
        }
    }

    fn rows(&self) -> Vec<(&'static str, String, String)> {
        let sources = self.sources;
        vec![
            ("url", self.url.to_string(), sources.url.to_string()),
            ("user", self.user.to_string(), sources.user.to_string()),
            ("password", self.password.to_string(), sources.password.to_string()),
            ("api_prefix", self.api_prefix.to_string(), sources.api_prefix.to_string()),
            (
                "ca_file",
                self.ca_file.clone().unwrap_or_else(|| "-".to_string()),
                sources.ca_file.to_string(),
            ),
            ("insecure", self.insecure.to_string(), sources.insecure.to_string()),
            ("timeout_seconds", self.timeout_seconds.to_string(), sources.timeout.to_string()),
            (
                "poll_interval_ms",
                self.poll_interval_ms.to_string(),
                sources.poll_interval.to_string(),
            ),
            (
                "max_attempts",
                self.max_attempts
                    .map_or_else(|| "unbounded".to_string(), |n| n.to_string()),
                sources.max_attempts.to_string(),
            ),
            ("format", self.format.to_string(), sources.format.to_string()),
            ("pretty", self.pretty.to_string(), sources.pretty.to_string()),
            ("no_color", self.no_color.to_string(), sources.no_color.to_string()),
        ]
    }
}

/// Execute a config subcommand.
pub fn execute(command: &ConfigCommand, config: &ResolvedConfig, output: &OutputOptions) -> Result<()> {
    match command {
        ConfigCommand::Show => show(config, output),
        ConfigCommand::Init => init(config, output),
    }
}

fn show(config: &ResolvedConfig, output: &OutputOptions) -> Result<()> {
    let view = ConfigView::new(config);
    let rendered = output.render("config", &view, |no_color| {
        let mut out = human::render_settings(&view.rows(), no_color);
        out.push_str(&format!("\nConfig file: {}\n", view.config_path));
        out
    })?;
    print_output(&rendered);
    Ok(())
}

fn init(config: &ResolvedConfig, output: &OutputOptions) -> Result<()> {
    let path = &config.config_path;
    let created = if path.exists() {
        false
    } else {
        Config::template().save_to(path)?;
        tracing::info!(path = %path.display(), "config file created");
        true
    };

    let data = json!({ "path": path.display().to_string(), "created": created });
    let rendered = output.render("config", data, |_| {
        if created {
            format!("Created {}\n", path.display())
        } else {
            format!("{} already exists, left unchanged\n", path.display())
        }
    })?;
    print_output(&rendered);
    Ok(())
}
