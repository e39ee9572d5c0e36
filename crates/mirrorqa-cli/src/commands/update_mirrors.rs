use crate::crawler::{fetch_current_mirrors, CrawlConfig};
use anyhow::{Context, Result};
use clap::Parser;
use mirrorqa_core::duration::{duration_var, required_string_var, string_var};
use mirrorqa_db::{Pool, Registry};
use std::collections::BTreeSet;
use std::time::Duration;

use super::utils::{create_spinner, error, success};

#[derive(Parser)]
pub struct UpdateMirrorsArgs {}

pub async fn execute(_args: UpdateMirrorsArgs) -> Result<()> {
    let database_url = required_string_var("POSTGRES_URI")
        .or_else(|_| required_string_var("DATABASE_URL"))
        .context("database connection string not configured")?;
    let mirrors_url = string_var("MIRRORS_LIST_URL", "https://download.kiwix.org/mirrors.html");
    let excluded_hostnames: BTreeSet<String> = string_var("EXCLUDED_MIRRORS", "mirror.isoc.org.il")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let timeout = duration_var("REQUESTS_TIMEOUT_DURATION", Duration::from_secs(10))?;

    let spinner = create_spinner("Fetching upstream mirror list...");
    let mirrors = fetch_current_mirrors(&CrawlConfig {
        mirrors_url,
        excluded_hostnames,
        timeout,
    })
    .await;
    spinner.finish_and_clear();

    let mirrors = match mirrors {
        Ok(m) if m.is_empty() => {
            error("upstream mirror list returned no usable mirrors, refusing to reconcile");
            anyhow::bail!("empty mirror list");
        }
        Ok(m) => m,
        Err(e) => {
            error(&e.to_string());
            return Err(e.into());
        }
    };

    let pool = Pool::from_url(&database_url).await?;
    let registry = Registry::new(pool);
    let counts = registry.reconcile_mirrors(&mirrors).await?;

    success(&format!(
        "reconciled {} mirrors: {} added/re-enabled, {} disabled",
        mirrors.len(),
        counts.added,
        counts.disabled
    ));
    Ok(())
}
