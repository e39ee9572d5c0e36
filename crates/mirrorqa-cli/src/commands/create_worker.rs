use anyhow::{bail, Context, Result};
use clap::Parser;
use mirrorqa_auth::handshake::fingerprint;
use mirrorqa_core::duration::required_string_var;
use mirrorqa_db::{Pool, Registry};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::PathBuf;

use super::utils::success;

#[derive(Parser)]
pub struct CreateWorkerArgs {
    /// Worker identifier.
    pub id: String,

    /// Comma-separated 2-letter country codes this worker serves.
    #[arg(long, value_delimiter = ',')]
    pub countries: Vec<String>,

    /// Path to the worker's PKCS#8 PEM public key, or `-` for stdin.
    pub public_key_file: PathBuf,
}

fn validate_countries(codes: &[String]) -> Result<BTreeSet<String>> {
    let mut out = BTreeSet::new();
    for code in codes {
        let code = code.trim().to_ascii_lowercase();
        if !mirrorqa_core::iso_countries::is_valid(&code) {
            bail!("not a valid ISO 3166-1 country code: {code}");
        }
        out.insert(code);
    }
    Ok(out)
}

fn read_public_key(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(path)
            .with_context(|| format!("reading public key file {}", path.display()))?)
    }
}

pub async fn execute(args: CreateWorkerArgs) -> Result<()> {
    let countries = validate_countries(&args.countries)?;
    let pubkey_pem = read_public_key(&args.public_key_file)?;
    let pubkey_fingerprint = fingerprint(&pubkey_pem).context("invalid public key")?;

    let database_url = required_string_var("POSTGRES_URI")
        .or_else(|_| required_string_var("DATABASE_URL"))
        .context("database connection string not configured")?;
    let pool = Pool::from_url(&database_url).await?;
    let registry = Registry::new(pool);

    let worker = registry
        .create_worker(&args.id, &pubkey_pem, &pubkey_fingerprint, &countries)
        .await?;

    success(&format!(
        "created worker {} (fingerprint {})",
        worker.id, worker.pubkey_fingerprint
    ));
    Ok(())
}
