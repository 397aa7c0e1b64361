use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use trendfeed_core::config::Profile;

use crate::config::Overrides;

#[derive(Debug, Parser)]
#[command(name = "trendfeed", version, about = "Build the trending media document for the widget host")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, normalize and merge every source, then write the document.
    Run(RunArgs),
    /// Check that an existing document is well formed.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// TOML config file. Defaults to ./trendfeed.toml when present.
    #[arg(long, env = "TRENDFEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Built-in source set: feeds or tmdb.
    #[arg(long)]
    pub profile: Option<Profile>,

    /// Destination of the JSON document.
    #[arg(long, env = "TRENDFEED_OUTPUT")]
    pub output: Option<PathBuf>,

    #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
    pub tmdb_api_key: Option<String>,

    /// Offset from UTC for `last_updated`, e.g. 8 for Beijing time.
    #[arg(long, allow_hyphen_values = true)]
    pub utc_offset_hours: Option<i32>,

    /// Keep running and refresh the document every N hours.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub every_hours: Option<u64>,
}

impl RunArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            profile: self.profile,
            output: self.output.clone(),
            utc_offset_hours: self.utc_offset_hours,
            tmdb_api_key: self
                .tmdb_api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Document to check.
    pub path: PathBuf,
}
