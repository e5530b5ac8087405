//! Output rendering for human and robot modes.

pub mod error;
pub mod human;
pub mod robot;

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::Result;

/// How command output is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub no_color: bool,
}

impl OutputOptions {
    /// Human text from `human`, or the robot envelope of `data`.
    ///
    /// `human` is only called in human mode.
    pub fn render<T: Serialize>(
        &self,
        command: &str,
        data: T,
        human: impl FnOnce(bool) -> String,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(human(self.no_color)),
            OutputFormat::Json => robot::render_envelope(command, data, self.pretty),
        }
    }
}
