//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux: `~/.config/infra-usage/config.toml`
//! - macOS: `~/Library/Application Support/io.infra-usage.infra-usage/config.toml`
//! - Windows: `%APPDATA%/infra-usage/infra-usage/config/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `INFRA_USAGE_URL`, `INFRA_USAGE_USER`, `INFRA_USAGE_PASSWORD`: gateway access
//! - `INFRA_USAGE_CA_FILE`, `INFRA_USAGE_INSECURE`: TLS verification
//! - `INFRA_USAGE_FORMAT`: Output format (human, json)
//! - `INFRA_USAGE_PRETTY`: Pretty-print JSON output (1, true, yes)
//! - `INFRA_USAGE_NO_COLOR` or `NO_COLOR`: Disable colors
//! - `INFRA_USAGE_POLL_INTERVAL_MS`, `INFRA_USAGE_MAX_POLL_ATTEMPTS`: polling
//! - `INFRA_USAGE_CONFIG`: Override config file path

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cli::args::{Cli, OutputFormat, ReportArgs};
use crate::core::client::{ClientOptions, DEFAULT_API_PREFIX, TlsOptions};
use crate::core::query::PollPolicy;
use crate::core::session::Credentials;
use crate::error::{Result, UsageError};

// =============================================================================
// Environment Variable Names
// =============================================================================

pub const ENV_URL: &str = "INFRA_USAGE_URL";
pub const ENV_USER: &str = "INFRA_USAGE_USER";
pub const ENV_PASSWORD: &str = "INFRA_USAGE_PASSWORD";
pub const ENV_CA_FILE: &str = "INFRA_USAGE_CA_FILE";
pub const ENV_INSECURE: &str = "INFRA_USAGE_INSECURE";
pub const ENV_FORMAT: &str = "INFRA_USAGE_FORMAT";
pub const ENV_PRETTY: &str = "INFRA_USAGE_PRETTY";
pub const ENV_NO_COLOR: &str = "INFRA_USAGE_NO_COLOR";
/// Standard environment variable to disable colors.
pub const ENV_NO_COLOR_STD: &str = "NO_COLOR";
pub const ENV_POLL_INTERVAL_MS: &str = "INFRA_USAGE_POLL_INTERVAL_MS";
pub const ENV_MAX_POLL_ATTEMPTS: &str = "INFRA_USAGE_MAX_POLL_ATTEMPTS";
/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "INFRA_USAGE_CONFIG";

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_URL: &str = "http://localhost:8088";
pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "changeme";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const MAX_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    pub api_prefix: String,
    pub tls: TlsOptions,
    pub timeout: Duration,
    pub poll: PollPolicy,
    pub format: OutputFormat,
    pub pretty: bool,
    pub no_color: bool,
    /// Config file that was consulted, whether or not it exists.
    pub config_path: PathBuf,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigSources {
    pub url: ConfigSource,
    pub user: ConfigSource,
    pub password: ConfigSource,
    pub api_prefix: ConfigSource,
    pub ca_file: ConfigSource,
    pub insecure: ConfigSource,
    pub timeout: ConfigSource,
    pub poll_interval: ConfigSource,
    pub max_attempts: ConfigSource,
    pub format: ConfigSource,
    pub pretty: ConfigSource,
    pub no_color: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// First present layer wins; records which one.
fn layered<T>(
    cli: Option<T>,
    env: Option<T>,
    file: Option<T>,
    default: T,
    source: &mut ConfigSource,
) -> T {
    if let Some(value) = cli {
        *source = ConfigSource::Cli;
        value
    } else if let Some(value) = env {
        *source = ConfigSource::Env;
        value
    } else if let Some(value) = file {
        *source = ConfigSource::ConfigFile;
        value
    } else {
        *source = ConfigSource::Default;
        default
    }
}

/// A flag only counts when it is set.
const fn flag(set: bool) -> Option<bool> {
    if set { Some(true) } else { None }
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI args, environment variables, and config file.
    ///
    /// `report` carries the polling flags of the `report` command.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file exists but is invalid
    /// - Any resolved value is invalid (e.g., a zero poll interval)
    pub fn resolve(cli: &Cli, report: Option<&ReportArgs>) -> Result<Self> {
        let path = Self::config_path();
        let config = Config::load_from(&path)?;
        config.validate()?;
        Self::from_config(cli, report, &config, path)
    }

    /// Config file path, respecting the `INFRA_USAGE_CONFIG` override.
    #[must_use]
    pub fn config_path() -> PathBuf {
        std::env::var(ENV_CONFIG)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map_or_else(|| AppPaths::new().config_file(), PathBuf::from)
    }

    /// Merge an already loaded config file with CLI flags and the environment.
    ///
    /// # Errors
    ///
    /// An unparsable environment value or an out-of-range result.
    pub fn from_config(
        cli: &Cli,
        report: Option<&ReportArgs>,
        config: &Config,
        config_path: PathBuf,
    ) -> Result<Self> {
        let mut sources = ConfigSources::default();
        let gateway = &config.gateway;

        let url = layered(
            cli.url.clone(),
            env_value(ENV_URL),
            gateway.url.clone(),
            DEFAULT_URL.to_string(),
            &mut sources.url,
        );
        let user = layered(
            cli.user.clone(),
            env_value(ENV_USER),
            gateway.user.clone(),
            DEFAULT_USER.to_string(),
            &mut sources.user,
        );
        let password = layered(
            cli.password.clone(),
            env_value(ENV_PASSWORD),
            gateway.password.clone(),
            DEFAULT_PASSWORD.to_string(),
            &mut sources.password,
        );
        let api_prefix = layered(
            cli.api_prefix.clone(),
            None,
            gateway.api_prefix.clone(),
            DEFAULT_API_PREFIX.to_string(),
            &mut sources.api_prefix,
        );

        let ca_file = layered(
            cli.ca_file.clone().map(Some),
            env_value(ENV_CA_FILE).map(|p| Some(PathBuf::from(p))),
            config.tls.ca_file.clone().map(Some),
            None,
            &mut sources.ca_file,
        );
        let insecure = layered(
            flag(cli.insecure),
            flag(is_env_truthy(ENV_INSECURE)),
            flag(config.tls.insecure),
            false,
            &mut sources.insecure,
        );

        let timeout_secs = layered(
            None,
            None,
            gateway.timeout_seconds,
            DEFAULT_TIMEOUT_SECS,
            &mut sources.timeout,
        );

        let interval_ms = layered(
            report.and_then(|r| r.interval_ms),
            env_parse::<u64>(ENV_POLL_INTERVAL_MS)?,
            config.polling.interval_ms,
            DEFAULT_POLL_INTERVAL_MS,
            &mut sources.poll_interval,
        );
        let max_attempts = layered(
            report.and_then(|r| r.max_attempts).map(Some),
            env_parse::<u32>(ENV_MAX_POLL_ATTEMPTS)?.map(Some),
            config.polling.max_attempts.map(Some),
            None,
            &mut sources.max_attempts,
        );

        let format = layered(
            cli.format_flag(),
            env_value(ENV_FORMAT)
                .map(|raw| parse_format(ENV_FORMAT, &raw))
                .transpose()?,
            config
                .output
                .format
                .as_deref()
                .map(|raw| parse_format("output.format", raw))
                .transpose()?,
            OutputFormat::Human,
            &mut sources.format,
        );
        let pretty = layered(
            flag(cli.pretty),
            flag(is_env_truthy(ENV_PRETTY)),
            flag(config.output.pretty),
            false,
            &mut sources.pretty,
        );
        let no_color = layered(
            flag(cli.no_color),
            flag(is_env_truthy(ENV_NO_COLOR) || std::env::var_os(ENV_NO_COLOR_STD).is_some()),
            flag(!config.output.color),
            false,
            &mut sources.no_color,
        );

        let resolved = Self {
            url,
            user,
            password,
            api_prefix,
            tls: TlsOptions { ca_file, insecure },
            timeout: Duration::from_secs(timeout_secs),
            poll: PollPolicy::new(Duration::from_millis(interval_ms))
                .with_max_attempts(max_attempts),
            format,
            pretty,
            no_color,
            config_path,
            sources,
        };
        resolved.validate()?;
        Ok(resolved)
    }

    fn validate(&self) -> Result<()> {
        if self.poll.interval.is_zero() {
            return Err(UsageError::ConfigInvalid {
                key: "polling.interval_ms".to_string(),
                value: "0".to_string(),
                message: "poll interval must be greater than zero".to_string(),
            });
        }
        if self.poll.max_attempts == Some(0) {
            return Err(UsageError::ConfigInvalid {
                key: "polling.max_attempts".to_string(),
                value: "0".to_string(),
                message: "must be at least 1, leave it unset for no limit".to_string(),
            });
        }
        Ok(())
    }

    /// Options for building the gateway client.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions::new(
            self.url.clone(),
            Credentials::new(self.user.clone(), self.password.clone()),
        )
        .with_api_prefix(self.api_prefix.clone())
        .with_tls(self.tls.clone())
        .with_timeout(self.timeout)
    }
}

/// Non-empty value of an environment variable.
fn env_value(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(var: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env_value(var)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| UsageError::ConfigInvalid {
                    key: var.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                })
        })
        .transpose()
}

/// Check if an environment variable is set to a truthy value.
fn is_env_truthy(var: &str) -> bool {
    std::env::var(var)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn parse_format(key: &str, raw: &str) -> Result<OutputFormat> {
    match raw.trim().to_lowercase().as_str() {
        "human" => Ok(OutputFormat::Human),
        "json" => Ok(OutputFormat::Json),
        _ => Err(UsageError::ConfigInvalid {
            key: key.to_string(),
            value: raw.to_string(),
            message: "valid formats: human, json".to_string(),
        }),
    }
}

/// Serializes tests that read or write the variables above.
#[cfg(test)]
pub(crate) static TEST_ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

// =============================================================================
// Config file
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub tls: TlsConfig,
    pub polling: PollingConfig,
    pub output: OutputConfig,
}

/// Gateway access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_prefix: Option<String>,
    /// Request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// Certificate verification for https gateways.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,
    pub insecure: bool,
}

/// Status polling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (human, json).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Whether to use colors in output.
    pub color: bool,
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            pretty: false,
        }
    }
}

impl Config {
    /// Starting point written by `config init`.
    #[must_use]
    pub fn template() -> Self {
        Self {
            gateway: GatewayConfig {
                url: Some(DEFAULT_URL.to_string()),
                user: Some(DEFAULT_USER.to_string()),
                password: None,
                api_prefix: None,
                timeout_seconds: Some(DEFAULT_TIMEOUT_SECS),
            },
            tls: TlsConfig::default(),
            polling: PollingConfig {
                interval_ms: Some(DEFAULT_POLL_INTERVAL_MS),
                max_attempts: None,
            },
            output: OutputConfig::default(),
        }
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "loading config file");
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| UsageError::Config(format!("invalid config file {}: {e}", path.display())))?;

        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| UsageError::Config(format!("failed to serialize config: {e}")))?;

        fs::write(path, content)?;
        tracing::debug!(?path, "config file saved");
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// Checks that:
    /// - Output format is valid (human, json)
    /// - Timeout is within reasonable bounds (1-300 seconds)
    /// - Poll interval is greater than zero
    pub fn validate(&self) -> Result<()> {
        if let Some(format) = &self.output.format {
            parse_format("output.format", format)?;
        }

        if let Some(timeout) = self.gateway.timeout_seconds {
            if timeout == 0 || timeout > MAX_TIMEOUT_SECS {
                return Err(UsageError::ConfigInvalid {
                    key: "gateway.timeout_seconds".to_string(),
                    value: timeout.to_string(),
                    message: format!("timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds"),
                });
            }
        }

        if self.polling.interval_ms == Some(0) {
            return Err(UsageError::ConfigInvalid {
                key: "polling.interval_ms".to_string(),
                value: "0".to_string(),
                message: "poll interval must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}
