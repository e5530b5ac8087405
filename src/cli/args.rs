//! CLI argument definitions using clap.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::query::QueryId;

/// Infrastructure usage collection client.
#[derive(Parser, Debug)]
#[command(name = "infra-usage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Gateway connection ===
    /// Gateway URL (http:// is assumed when no scheme is given)
    #[arg(long, value_name = "URL", global = true)]
    pub url: Option<String>,

    /// User name
    #[arg(long, value_name = "USER", global = true)]
    pub user: Option<String>,

    /// Password
    #[arg(long, value_name = "PASSWORD", global = true)]
    pub password: Option<String>,

    /// Certificate authority file used to verify an https gateway
    #[arg(long, value_name = "FILE", global = true)]
    pub ca_file: Option<PathBuf>,

    /// Skip certificate verification of an https gateway
    #[arg(long, global = true)]
    pub insecure: bool,

    /// REST prefix of the usage collector plugin
    #[arg(long, value_name = "PREFIX", global = true, hide = true)]
    pub api_prefix: Option<String>,

    // === Output ===
    /// Output format
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Output format requested on the command line, if any.
    #[must_use]
    pub const fn format_flag(&self) -> Option<OutputFormat> {
        if self.json {
            Some(OutputFormat::Json)
        } else {
            self.format
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect usage on a location and print the report
    Report(ReportArgs),

    /// List orchestrators
    Orchestrators,

    /// List usage collectors of an orchestrator
    Collectors(CollectorsArgs),

    /// List usage collection queries of an orchestrator
    Queries(QueriesArgs),

    /// Show the status and results of a query
    Status(QueryArgs),

    /// Delete a query
    Delete(QueryArgs),

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Arguments for the `report` command.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Orchestrator name
    #[arg(long, short = 'o', value_name = "NAME")]
    pub orchestrator: String,

    /// Location type, i.e. the usage collector id
    #[arg(long = "type", short = 't', value_name = "COLLECTOR")]
    pub location_type: String,

    /// Location for which to get a usage report
    #[arg(long, short = 'l', value_name = "LOCATION")]
    pub location: String,

    /// Query parameter of the form key=value (repeatable)
    #[arg(long = "query", short = 'q', value_name = "KEY=VALUE", value_parser = parse_query_param)]
    pub query: Vec<(String, String)>,

    /// Milliseconds between two status checks
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Give up after this many status checks
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,
}

impl ReportArgs {
    /// Query parameters, the last occurrence of a key winning.
    #[must_use]
    pub fn query_params(&self) -> BTreeMap<String, String> {
        self.query.iter().cloned().collect()
    }
}

/// Parse `key=value`; the value may contain further `=`.
fn parse_query_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!(
            "expected query parameter of the form key=value, got {raw}"
        )),
    }
}

/// Arguments for the `collectors` command.
#[derive(Args, Debug)]
pub struct CollectorsArgs {
    /// Orchestrator name
    #[arg(long, short = 'o', value_name = "NAME")]
    pub orchestrator: String,
}

/// Arguments for the `queries` command.
#[derive(Args, Debug)]
pub struct QueriesArgs {
    /// Orchestrator name
    #[arg(long, short = 'o', value_name = "NAME")]
    pub orchestrator: String,

    /// Only queries of this collector
    #[arg(long, short = 'c', value_name = "COLLECTOR")]
    pub collector: Option<String>,
}

/// A single query, by id.
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Query id: <orchestrator>/infra_usage/<collector>/tasks/<id>
    #[arg(value_name = "QUERY_ID")]
    pub query_id: QueryId,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the resolved configuration and where each value came from
    Show,

    /// Write a default configuration file if none exists
    Init,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
}
