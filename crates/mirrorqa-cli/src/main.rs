use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod crawler;

#[derive(Parser)]
#[command(name = "mirrorqa")]
#[command(version, about = "mirrors-qa control plane CLI", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run mirror reconciliation once.
    UpdateMirrors(commands::update_mirrors::UpdateMirrorsArgs),

    /// Run the scheduler loop.
    Scheduler(commands::scheduler::SchedulerArgs),

    /// Provision a worker.
    CreateWorker(commands::create_worker::CreateWorkerArgs),

    /// Replace a worker's country set.
    UpdateWorker(commands::update_worker::UpdateWorkerArgs),

    /// Import Country+Region from a CSV file.
    CreateCountries(commands::create_countries::CreateCountriesArgs),

    /// Start the HTTP API server.
    Serve(commands::serve::ServeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mirrorqa={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::UpdateMirrors(args) => commands::update_mirrors::execute(args).await,
        Commands::Scheduler(args) => commands::scheduler::execute(args).await,
        Commands::CreateWorker(args) => commands::create_worker::execute(args).await,
        Commands::UpdateWorker(args) => commands::update_worker::execute(args).await,
        Commands::CreateCountries(args) => commands::create_countries::execute(args).await,
        Commands::Serve(args) => commands::serve::execute(args).await,
    }
}
