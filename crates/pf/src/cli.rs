//! CLI argument parsing using clap derive macros.
//!
//! This module defines the command-line interface for the pf CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// pf - Convert data-preparation filters to and from the backend filter tree
#[derive(Parser, Debug)]
#[command(name = "pf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (show debug logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Force JSON output (auto-detected when not a TTY)
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Timezone for date ranges: "local" or an IANA name (default: from config)
    #[arg(long, global = true, env = "PF_TIMEZONE")]
    pub timezone: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Combine a JSON list of filters into a filter tree
    #[command(alias = "tt")]
    ToTree {
        /// File holding the filter list (default: stdin)
        file: Option<PathBuf>,
    },

    /// Rebuild the filter list of a filter tree
    #[command(alias = "ft")]
    FromTree {
        /// File holding the tree (default: stdin)
        file: Option<PathBuf>,

        /// File holding the column metadata, a JSON list of {id, name}
        #[arg(short, long)]
        columns: Option<PathBuf>,
    },

    /// Build a single filter and show its tree
    #[command(alias = "c")]
    Create {
        /// Filter type
        #[arg(short = 't', long = "type", value_enum)]
        filter_type: FilterTypeArg,

        /// Column id
        #[arg(long)]
        column: Option<String>,

        /// Column name
        #[arg(long)]
        name: Option<String>,

        /// Filter arguments as JSON (e.g. '{"phrase": [{"value": "x"}]}')
        #[arg(short, long)]
        args: Option<String>,

        /// Mark the filter as editable
        #[arg(long)]
        editable: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Filter types accepted by `create`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterTypeArg {
    Contains,
    Exact,
    Matches,
    InsideRange,
    InvalidRecords,
    EmptyRecords,
    ValidRecords,
    Quality,
}

impl From<FilterTypeArg> for prep_filter_rs::FilterType {
    fn from(arg: FilterTypeArg) -> Self {
        use prep_filter_rs::FilterType;

        match arg {
            FilterTypeArg::Contains => FilterType::Contains,
            FilterTypeArg::Exact => FilterType::Exact,
            FilterTypeArg::Matches => FilterType::Matches,
            FilterTypeArg::InsideRange => FilterType::InsideRange,
            FilterTypeArg::InvalidRecords => FilterType::InvalidRecords,
            FilterTypeArg::EmptyRecords => FilterType::EmptyRecords,
            FilterTypeArg::ValidRecords => FilterType::ValidRecords,
            FilterTypeArg::Quality => FilterType::Quality,
        }
    }
}

/// Shell types for completions
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },

    /// Print config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["pf", "--verbose", "to-tree"]);
        assert!(cli.verbose);
        assert!(!cli.quiet);
        assert!(!cli.json);

        let cli = Cli::parse_from(["pf", "--quiet", "--json", "to-tree"]);
        assert!(!cli.verbose);
        assert!(cli.quiet);
        assert!(cli.json);
    }

    #[test]
    fn test_timezone_flag() {
        let cli = Cli::parse_from(["pf", "--timezone", "Europe/Paris", "to-tree"]);
        assert_eq!(cli.timezone, Some("Europe/Paris".to_string()));
    }

    #[test]
    fn test_from_tree_columns() {
        let cli = Cli::parse_from(["pf", "from-tree", "tree.json", "--columns", "cols.json"]);
        match cli.command {
            Some(Commands::FromTree { file, columns }) => {
                assert_eq!(file, Some(PathBuf::from("tree.json")));
                assert_eq!(columns, Some(PathBuf::from("cols.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_aliases() {
        let cli = Cli::parse_from(["pf", "tt"]);
        assert!(matches!(cli.command, Some(Commands::ToTree { .. })));

        let cli = Cli::parse_from(["pf", "ft"]);
        assert!(matches!(cli.command, Some(Commands::FromTree { .. })));
    }

    #[test]
    fn test_create_type_names() {
        let cli = Cli::parse_from(["pf", "create", "--type", "inside-range", "--column", "0001"]);
        match cli.command {
            Some(Commands::Create {
                filter_type,
                column,
                ..
            }) => {
                assert_eq!(filter_type, FilterTypeArg::InsideRange);
                assert_eq!(column, Some("0001".to_string()));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_filter_type_arg_conversion() {
        let filter_type: prep_filter_rs::FilterType = FilterTypeArg::EmptyRecords.into();
        assert_eq!(filter_type.as_str(), "empty_records");
    }
}
