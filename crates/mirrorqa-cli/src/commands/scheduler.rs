//! `scheduler` subcommand — runs the C5 loop (spec §4.5) until killed.

use anyhow::{Context, Result};
use chrono::Duration as ChronoDuration;
use clap::Parser;
use mirrorqa_core::duration::required_string_var;
use mirrorqa_db::{Pool, Registry};
use std::time::Duration;

use super::utils::info;

#[derive(Parser)]
pub struct SchedulerArgs {
    /// Interval between ticks.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "3h")]
    pub sleep: Duration,

    /// A worker is idle when `last_seen_on` is older than this.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1h")]
    pub workers_since: Duration,

    /// A PENDING Test is expired to MISSED when older than this.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1d")]
    pub expire_tests_since: Duration,
}

pub async fn execute(args: SchedulerArgs) -> Result<()> {
    let database_url = required_string_var("POSTGRES_URI")
        .or_else(|_| required_string_var("DATABASE_URL"))
        .context("database connection string not configured")?;
    let pool = Pool::from_url(&database_url).await?;
    let registry = Registry::new(pool);

    let idle_since = ChronoDuration::from_std(args.workers_since)?;
    let expire_since = ChronoDuration::from_std(args.expire_tests_since)?;

    info("scheduler started");
    loop {
        if let Err(e) = run_tick(&registry, idle_since, expire_since).await {
            tracing::error!(error = %e, "scheduler tick failed, will retry next cycle");
        }
        tokio::time::sleep(args.sleep).await;
    }
}

async fn run_tick(
    registry: &Registry,
    idle_since: ChronoDuration,
    expire_since: ChronoDuration,
) -> Result<()> {
    let missed = registry.expire_tests(expire_since).await?;
    if !missed.is_empty() {
        tracing::info!(count = missed.len(), "expired PENDING tests to MISSED");
    }

    let idle_workers = registry.get_idle_workers(idle_since).await?;
    let mirrors = registry.list_enabled_mirrors().await?;
    if mirrors.is_empty() {
        tracing::warn!("no enabled mirrors, skipping test creation this tick");
        return Ok(());
    }

    for worker in idle_workers {
        if worker.countries.is_empty() {
            continue;
        }
        let pending = registry.count_pending_tests_for_worker(&worker.id).await?;
        if pending > 0 {
            continue;
        }

        for country in &worker.countries {
            for mirror in &mirrors {
                registry
                    .create_test(&worker.id, &mirror.base_url, country)
                    .await?;
            }
        }
    }

    Ok(())
}
