//! Command implementations for the pf CLI.
//!
//! This module contains the actual command handlers that are invoked by the CLI.

pub mod completions;
pub mod config;
pub mod convert;

use std::fmt;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::Path;

use prep_filter_rs::FilterError;

use crate::cli::Cli;
use config::Config;

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Filter conversion error.
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Timezone used to normalize date range bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// The machine's local timezone.
    Local,
    /// A named IANA timezone.
    Named(chrono_tz::Tz),
}

impl Zone {
    /// Parses `"local"` or an IANA name such as `Europe/Paris`.
    pub fn parse(name: &str) -> Result<Self> {
        if name.eq_ignore_ascii_case("local") {
            return Ok(Zone::Local);
        }
        name.parse::<chrono_tz::Tz>()
            .map(Zone::Named)
            .map_err(|_| CommandError::Config(format!("Unknown timezone '{name}'")))
    }

    /// Resolves the zone with priority: flag > env > config > local.
    ///
    /// The flag and the `PF_TIMEZONE` variable both arrive through
    /// `cli_value`, since clap reads the variable for the flag.
    pub fn resolve(cli_value: Option<&str>, config: &Config) -> Result<Self> {
        match cli_value.or(config.dates.timezone.as_deref()) {
            Some(name) => Self::parse(name),
            None => Ok(Zone::Local),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => f.write_str("local"),
            Zone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Context for command execution, containing common dependencies.
pub struct CommandContext {
    /// Whether to output JSON.
    pub json_output: bool,
    /// Whether to pretty-print JSON.
    pub pretty: bool,
    /// Whether to use colors.
    pub use_colors: bool,
    /// Whether to be quiet (errors only).
    pub quiet: bool,
    /// Timezone for date ranges.
    pub zone: Zone,
}

impl CommandContext {
    /// Creates a new command context from CLI arguments and the loaded config.
    pub fn from_cli(cli: &Cli, config: &Config) -> Result<Self> {
        let is_tty = io::stdout().is_terminal();
        let color_enabled = config.output.color.unwrap_or(true)
            && std::env::var_os("NO_COLOR").is_none();

        Ok(Self {
            json_output: cli.json || !is_tty,
            pretty: config.output.pretty.unwrap_or(true),
            use_colors: !cli.no_color && color_enabled && is_tty,
            quiet: cli.quiet,
            zone: Zone::resolve(cli.timezone.as_deref(), config)?,
        })
    }

    /// Serializes a value as JSON honoring the `pretty` setting.
    pub fn to_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(json)
    }
}

/// Reads a whole input file, or stdin when no path is given.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
