//! `mirrorqa-task run <url> --output=<file>` — one-shot download measurement (C7).
//!
//! Invoked by the worker manager inside a container attached to the active
//! VPN tunnel's network namespace; writes its result as a JSON file and
//! exits. Has no dependency on the rest of the workspace beyond the shared
//! metrics shape in `mirrorqa-core`.

mod download;
mod error;

use clap::{Parser, Subcommand};
use download::DownloadConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mirrorqa-task")]
#[command(about = "One-shot mirror download measurement", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download `url` and write a metrics record to `--output`.
    Run(RunArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// The object URL to download.
    url: String,

    /// Path to write the JSON metrics record to.
    #[arg(long)]
    output: PathBuf,

    /// Per-attempt request timeout.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    timeout: Duration,

    /// Size of the read buffer used while draining the response body.
    #[arg(long, default_value_t = 65536)]
    chunk_size: usize,

    /// Additional attempts after the first failure.
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Base backoff interval; attempt `n`'s sleep is `interval * n`.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
    interval: Duration,

    /// `User-Agent` header sent with each request.
    #[arg(long, default_value = "mirrorqa-task/0.1")]
    user_agent: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mirrorqa_task=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let Commands::Run(args) = cli.command;

    let metrics = download::run(&DownloadConfig {
        url: args.url,
        timeout: args.timeout,
        chunk_size: args.chunk_size,
        retries: args.retries,
        interval: args.interval,
        user_agent: args.user_agent,
    })
    .await;

    let json = serde_json::to_string_pretty(&metrics)?;
    std::fs::write(&args.output, json).map_err(|source| error::TaskError::Output {
        path: args.output.display().to_string(),
        source,
    })?;

    if matches!(metrics.status, mirrorqa_core::models::TaskStatus::Errored) {
        std::process::exit(1);
    }
    Ok(())
}
