use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trendfeed_cli::cli::{Cli, Command, RunArgs, ValidateArgs};
use trendfeed_cli::{config, pipeline};
use trendfeed_metadata::http::HttpFeedProvider;
use trendfeed_store::reader::{REQUIRED_BUCKETS, read_document, validate_document};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Validate(args) => validate(args),
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = config::load(args.config.as_deref(), &args.overrides())?;
    let provider =
        HttpFeedProvider::new(&config.fetch).context("failed to build http client")?;

    match args.every_hours {
        Some(hours) => {
            info!(every_hours = hours, "running on a schedule");
            pipeline::run_every(&config, &provider, Duration::from_secs(hours * 3600)).await;
            Ok(())
        }
        None => {
            let summary = pipeline::run(&config, &provider)
                .await
                .context("pipeline run failed")?;
            println!("{}", summary.path.display());
            Ok(())
        }
    }
}

fn validate(args: ValidateArgs) -> anyhow::Result<()> {
    let document = read_document(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    validate_document(&document, REQUIRED_BUCKETS)
        .with_context(|| format!("{} is not a valid document", args.path.display()))?;
    info!(
        path = %args.path.display(),
        last_updated = %document.last_updated,
        buckets = document.buckets.len(),
        records = document.record_count(),
        "document is valid"
    );
    Ok(())
}
