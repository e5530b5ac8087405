//! Configuration file and application paths.

pub mod config;
pub mod paths;

pub use config::{
    Config, ConfigSource, ConfigSources, ENV_CONFIG, ENV_FORMAT, ENV_NO_COLOR, ENV_NO_COLOR_STD,
    ENV_PASSWORD, ENV_PRETTY, ENV_URL, ENV_USER, ResolvedConfig,
};
pub use paths::AppPaths;
