use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the catalog-cache binary.
#[derive(Debug, Parser)]
#[command(
    name = "catalog-cache",
    version,
    about = "Catalog cache consistency tooling"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "CATALOG_CACHE_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Replay model events against a catalog fixture and print the list caches.
    Replay(ReplayArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub overrides: ReplayOverrides,

    /// TOML catalog fixture with `[[products]]` and `[[brands]]` tables.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub fixture: PathBuf,

    /// JSON-lines file of model events, one per line.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub events: PathBuf,

    /// Compare the final list caches against the catalog and fail on drift.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub verify: bool,

    /// Write the report to a file instead of stdout.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ReplayOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle cache maintenance on model events.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Declare the popularity-tracking extension installed.
    #[arg(
        long = "popularity-extension",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub popularity_extension: Option<bool>,
}
