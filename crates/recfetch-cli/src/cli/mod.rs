//! CLI for recfetch.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use recfetch_core::config;
use std::path::PathBuf;

use commands::{run_fetch, run_generate};

/// Top-level CLI for recfetch.
#[derive(Debug, Parser)]
#[command(name = "recfetch")]
#[command(about = "recfetch: rate-limited bulk export of JSON records by identifier", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch one JSON record per identifier from the API.
    Fetch(FetchArgs),

    /// Write placeholder records without touching the network.
    Generate(InputArgs),
}

/// Identifier source and output layout, shared by both commands.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// CSV file holding the identifiers.
    #[arg(long, default_value = "ids.csv", value_name = "PATH")]
    pub csv: PathBuf,

    /// Directory for per-identifier JSON files and aggregate outputs.
    #[arg(long, default_value = "records", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Only process the first N identifiers.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Skip identifiers that already have an output file.
    #[arg(long)]
    pub skip_existing: bool,

    /// Also write records.jsonl (one JSON object per line).
    #[arg(long)]
    pub jsonl: bool,

    /// Also write records.json, a single array of every record (may be large).
    #[arg(long)]
    pub combined: bool,
}

/// Options for `recfetch fetch`. Unset values fall back to the config file.
#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// URL template; `{id}` is replaced with the identifier.
    #[arg(long, value_name = "URL")]
    pub url_template: Option<String>,

    /// Bearer token for the Authorization header.
    #[arg(long, env = "RECFETCH_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Query parameter name for API-key authentication.
    #[arg(long, value_name = "NAME")]
    pub api_key_name: Option<String>,

    /// API key value (a `pat-` value is sent as a bearer token).
    #[arg(long, value_name = "VALUE")]
    pub api_key_value: Option<String>,

    /// Identifiers fetched concurrently.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Per-attempt HTTP timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Maximum requests per second across all workers.
    #[arg(long, value_name = "RPS")]
    pub rate_limit: Option<f64>,

    /// User-Agent header.
    #[arg(long)]
    pub user_agent: Option<String>,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch(args) => run_fetch(&cfg, args).await?,
            CliCommand::Generate(args) => run_generate(&args)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
