use anyhow::{bail, Context, Result};
use clap::Parser;
use mirrorqa_core::duration::required_string_var;
use mirrorqa_db::{Pool, Registry};
use std::collections::BTreeSet;

use super::utils::success;

#[derive(Parser)]
pub struct UpdateWorkerArgs {
    pub id: String,

    #[arg(long, value_delimiter = ',')]
    pub countries: Vec<String>,
}

pub async fn execute(args: UpdateWorkerArgs) -> Result<()> {
    let mut countries = BTreeSet::new();
    for code in &args.countries {
        let code = code.trim().to_ascii_lowercase();
        if !mirrorqa_core::iso_countries::is_valid(&code) {
            bail!("not a valid ISO 3166-1 country code: {code}");
        }
        countries.insert(code);
    }

    let database_url = required_string_var("POSTGRES_URI")
        .or_else(|_| required_string_var("DATABASE_URL"))
        .context("database connection string not configured")?;
    let pool = Pool::from_url(&database_url).await?;
    let registry = Registry::new(pool);

    if registry.get_worker(&args.id).await?.is_none() {
        bail!("worker {} does not exist", args.id);
    }
    registry.set_worker_countries(&args.id, &countries).await?;

    success(&format!("updated countries for worker {}", args.id));
    Ok(())
}
