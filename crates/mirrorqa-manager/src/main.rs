//! `mirrorqa-manager <worker-id> [--verbose]` — the C6 control loop.

use clap::Parser;
use mirrorqa_manager::{ManagerConfig, WorkerManager};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mirrorqa-manager")]
#[command(about = "Per-site worker manager for mirrors-qa", long_about = None)]
struct Cli {
    /// This site's worker id, as registered with the backend.
    worker_id: String,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mirrorqa_manager={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ManagerConfig::from_env(cli.worker_id)?;
    let manager = WorkerManager::start(config).await?;

    manager.run(shutdown_signal()).await?;
    Ok(())
}

/// Resolves when SIGINT, SIGTERM, or SIGQUIT is received.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        let mut sigquit = signal(SignalKind::quit()).expect("install SIGQUIT handler");

        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
            _ = sigquit.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
