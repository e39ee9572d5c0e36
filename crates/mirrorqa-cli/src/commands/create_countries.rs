//! `create-countries` — imports Country+Region from a CSV with columns
//! `country_iso_code, country_name, continent_code, continent_name`.

use anyhow::{Context, Result};
use clap::Parser;
use mirrorqa_core::duration::required_string_var;
use mirrorqa_db::{Pool, Registry};
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;

use super::utils::{info, success};

#[derive(Parser)]
pub struct CreateCountriesArgs {
    /// CSV file path, or `-` for stdin.
    pub csv_file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CountryRecord {
    country_iso_code: String,
    country_name: String,
    continent_code: String,
    continent_name: String,
}

fn read_csv(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(path)
            .with_context(|| format!("reading csv file {}", path.display()))?)
    }
}

pub async fn execute(args: CreateCountriesArgs) -> Result<()> {
    let raw = read_csv(&args.csv_file)?;
    let mut reader = csv::Reader::from_reader(raw.as_bytes());

    let database_url = required_string_var("POSTGRES_URI")
        .or_else(|_| required_string_var("DATABASE_URL"))
        .context("database connection string not configured")?;
    let pool = Pool::from_url(&database_url).await?;
    let registry = Registry::new(pool);

    let mut region_count = 0;
    let mut country_count = 0;
    for result in reader.deserialize::<CountryRecord>() {
        let record = result.context("malformed CSV row")?;
        let region_code = record.continent_code.trim().to_ascii_lowercase();
        let country_code = record.country_iso_code.trim().to_ascii_lowercase();

        if registry.get_region(&region_code).await?.is_none() {
            registry
                .create_region(&region_code, record.continent_name.trim())
                .await?;
            region_count += 1;
        }

        registry
            .create_country(
                &country_code,
                record.country_name.trim(),
                Some(&region_code),
            )
            .await?;
        country_count += 1;
    }

    info(&format!("imported {region_count} regions"));
    success(&format!("imported {country_count} countries"));
    Ok(())
}
