//! VPN tunnel discovery, cycling and healthchecks (§4.6 steps 1, 3, 4a-c).

use crate::docker::DockerRuntime;
use crate::error::ManagerResult;
use mirrorqa_core::iso_countries;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const ACTIVE_CONFIG_NAME: &str = "wg0.conf";
const HEALTHCHECK_URL: &str = "https://am.i.mullvad.net/json";

#[derive(Debug, Clone)]
pub struct TunnelConfig {
    pub path: PathBuf,
    pub country_code: String,
}

/// The JSON document returned by the geo-IP echo service from inside the
/// tunnel namespace; ground truth for the worker's apparent country and IP.
#[derive(Debug, Clone, Deserialize)]
pub struct EgressDescriptor {
    pub ip: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub organization: Option<String>,
}

/// Scans `dir` for `*.conf` files named `{cc}-*.conf` or `{cc}.conf`,
/// keeping only those whose prefix is a valid ISO 3166-1 alpha-2 code.
pub fn discover_configs(dir: &Path) -> ManagerResult<Vec<TunnelConfig>> {
    let mut configs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("conf") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let cc = stem.split('-').next().unwrap_or(stem).to_ascii_lowercase();
        if iso_countries::is_valid(&cc) {
            configs.push(TunnelConfig {
                path: path.clone(),
                country_code: cc,
            });
        }
    }
    Ok(configs)
}

/// Country codes this site can serve, derived purely from config filenames.
pub fn available_countries(configs: &[TunnelConfig]) -> std::collections::BTreeSet<String> {
    configs.iter().map(|c| c.country_code.clone()).collect()
}

pub fn group_by_country(configs: &[TunnelConfig]) -> BTreeMap<String, Vec<TunnelConfig>> {
    let mut map: BTreeMap<String, Vec<TunnelConfig>> = BTreeMap::new();
    for config in configs {
        map.entry(config.country_code.clone()).or_default().push(config.clone());
    }
    map
}

fn shuffled(mut configs: Vec<TunnelConfig>) -> Vec<TunnelConfig> {
    configs.shuffle(&mut rand::thread_rng());
    configs
}

pub fn candidates_for(configs: &[TunnelConfig], country_code: &str) -> Vec<TunnelConfig> {
    let matching: Vec<TunnelConfig> = configs
        .iter()
        .filter(|c| c.country_code == country_code)
        .cloned()
        .collect();
    shuffled(matching)
}

/// Copies `config` to the tunnel's active config path, cycles the interface
/// down then up via `exec`, and probes the healthcheck URL from inside the
/// tunnel namespace. Returns the parsed egress descriptor on success.
pub async fn cycle_and_probe(
    docker: &DockerRuntime,
    tunnel_container_id: &str,
    active_config_dir: &Path,
    config: &TunnelConfig,
) -> ManagerResult<Option<EgressDescriptor>> {
    std::fs::copy(&config.path, active_config_dir.join(ACTIVE_CONFIG_NAME))?;

    docker
        .exec(tunnel_container_id, vec!["wg-quick".into(), "down".into(), "wg0".into()])
        .await
        .ok();
    let up = docker
        .exec(tunnel_container_id, vec!["wg-quick".into(), "up".into(), "wg0".into()])
        .await?;
    if up.exit_code != 0 {
        return Ok(None);
    }

    probe(docker, tunnel_container_id).await
}

/// Runs the healthcheck from inside the tunnel namespace and parses the
/// response. `None` means the tunnel is not currently healthy.
pub async fn probe(
    docker: &DockerRuntime,
    tunnel_container_id: &str,
) -> ManagerResult<Option<EgressDescriptor>> {
    let result = docker
        .exec(
            tunnel_container_id,
            vec!["curl".into(), "-fsS".into(), HEALTHCHECK_URL.into()],
        )
        .await?;

    if result.exit_code != 0 {
        return Ok(None);
    }

    match serde_json::from_str::<EgressDescriptor>(&result.stdout) {
        Ok(descriptor) => Ok(Some(descriptor)),
        Err(e) => {
            tracing::warn!(error = %e, "healthcheck response was not a valid egress descriptor");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_configs_with_valid_country_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fr-paris.conf"), "").unwrap();
        fs::write(dir.path().join("ng.conf"), "").unwrap();
        fs::write(dir.path().join("zz-bogus.conf"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let configs = discover_configs(dir.path()).unwrap();
        let codes: std::collections::BTreeSet<_> =
            configs.iter().map(|c| c.country_code.clone()).collect();

        assert_eq!(
            codes,
            ["fr".to_string(), "ng".to_string()].into_iter().collect()
        );
    }

    #[test]
    fn candidates_for_filters_to_the_requested_country() {
        let configs = vec![
            TunnelConfig { path: "fr-a.conf".into(), country_code: "fr".into() },
            TunnelConfig { path: "fr-b.conf".into(), country_code: "fr".into() },
            TunnelConfig { path: "ng.conf".into(), country_code: "ng".into() },
        ];

        let fr = candidates_for(&configs, "fr");
        assert_eq!(fr.len(), 2);
        assert!(fr.iter().all(|c| c.country_code == "fr"));

        let de = candidates_for(&configs, "de");
        assert!(de.is_empty());
    }

    #[test]
    fn groups_configs_by_country() {
        let configs = vec![
            TunnelConfig { path: "fr-a.conf".into(), country_code: "fr".into() },
            TunnelConfig { path: "ng.conf".into(), country_code: "ng".into() },
        ];
        let grouped = group_by_country(&configs);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["fr"].len(), 1);
    }
}
