//! infra-usage - infrastructure usage collection client
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use infra_usage::cli::{Cli, Commands};
use infra_usage::core::logging::{self, LogSettings};
use infra_usage::render::OutputOptions;
use infra_usage::storage::ResolvedConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(&LogSettings::resolve(
        cli.log_level.as_deref(),
        cli.json_output,
        cli.verbose,
    ));

    // Until the configuration is resolved, only CLI flags decide how errors look.
    let mut output = OutputOptions {
        format: cli.format_flag().unwrap_or_default(),
        pretty: cli.pretty,
        no_color: cli.no_color,
    };

    match run(cli, &mut output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), "{e}");
            let rendered = infra_usage::render::error::render_error(
                &e,
                output.format,
                output.no_color,
                output.pretty,
            );
            eprintln!("{rendered}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli, output: &mut OutputOptions) -> infra_usage::Result<()> {
    let report_args = match &cli.command {
        Commands::Report(args) => Some(args),
        _ => None,
    };
    let config = ResolvedConfig::resolve(&cli, report_args)?;
    tracing::debug!(sources = ?config.sources, "configuration resolved");

    *output = OutputOptions {
        format: config.format,
        pretty: config.pretty,
        no_color: !infra_usage::util::env::should_use_color(config.no_color),
    };

    match &cli.command {
        Commands::Report(args) => infra_usage::cli::report::execute(args, &config, output).await,
        Commands::Orchestrators => infra_usage::cli::directory::orchestrators(&config, output).await,
        Commands::Collectors(args) => {
            infra_usage::cli::directory::collectors(args, &config, output).await
        }
        Commands::Queries(args) => infra_usage::cli::directory::queries(args, &config, output).await,
        Commands::Status(args) => infra_usage::cli::query::status(args, &config, output).await,
        Commands::Delete(args) => infra_usage::cli::query::delete(args, &config, output).await,
        Commands::Config(command) => infra_usage::cli::config::execute(command, &config, output),
    }
}
