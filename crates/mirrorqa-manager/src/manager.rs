//! The per-site worker manager control loop (C6, spec §4.6).

use crate::backend::BackendClient;
use crate::config::ManagerConfig;
use crate::docker::{bind_mount, DockerRuntime};
use crate::error::{ManagerError, ManagerResult};
use crate::tunnel::{self, EgressDescriptor, TunnelConfig};
use mirrorqa_core::models::{Test, TestUpdate};
use std::path::PathBuf;

const TUNNEL_CONTAINER_NAME: &str = "mirrorqa-tunnel";
const KERNEL_MODULES_PATH: &str = "/lib/modules";

pub struct WorkerManager {
    config: ManagerConfig,
    docker: DockerRuntime,
    backend: BackendClient,
    host_working_dir: String,
    tunnel_container_id: String,
    configs: Vec<TunnelConfig>,
}

impl WorkerManager {
    pub async fn start(config: ManagerConfig) -> ManagerResult<Self> {
        let private_key_pem = std::fs::read_to_string(&config.private_key_file)?;
        let private_key = mirrorqa_auth::handshake::load_private_key(&private_key_pem)?;
        let fingerprint = mirrorqa_auth::handshake::fingerprint_of_private_key(&private_key);
        tracing::info!(worker_id = %config.worker_id, %fingerprint, "manager starting");

        let docker = DockerRuntime::connect()?;

        let self_container_id = std::env::var("HOSTNAME").unwrap_or_default();
        let host_working_dir = docker
            .host_mount_path(&self_container_id, &config.working_dir.display().to_string())
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| config.working_dir.display().to_string());
        let host_modules_dir = docker
            .host_mount_path(&self_container_id, KERNEL_MODULES_PATH)
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| KERNEL_MODULES_PATH.to_string());

        let configs = tunnel::discover_configs(&config.working_dir)?;
        if configs.is_empty() {
            return Err(ManagerError::NoTunnelConfigs);
        }

        let backend = BackendClient::new(
            config.backend_api_uri.clone(),
            config.worker_id.clone(),
            private_key,
            config.requests_timeout,
        )?;

        let tunnel_container_id = docker
            .run_detached(
                TUNNEL_CONTAINER_NAME,
                &config.wireguard_image,
                None,
                vec![
                    bind_mount(&host_working_dir, &config.working_dir.display().to_string()),
                    bind_mount(&host_modules_dir, KERNEL_MODULES_PATH),
                ],
                vec!["NET_ADMIN".to_string()],
                None,
            )
            .await?;

        let mut manager = Self {
            config,
            docker,
            backend,
            host_working_dir,
            tunnel_container_id,
            configs,
        };

        manager.bring_up_first_available().await?;
        Ok(manager)
    }

    async fn bring_up_first_available(&mut self) -> ManagerResult<()> {
        for config in self.configs.clone() {
            if tunnel::cycle_and_probe(
                &self.docker,
                &self.tunnel_container_id,
                &self.config.working_dir,
                &config,
            )
            .await?
            .is_some()
            {
                return Ok(());
            }
        }
        Err(ManagerError::TunnelUnhealthy)
    }

    /// Runs the main loop (§4.6) until `shutdown` resolves.
    pub async fn run(mut self, shutdown: impl std::future::Future<Output = ()>) -> ManagerResult<()> {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received");
                    break;
                }
                result = self.tick() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "manager tick failed, will retry after sleep");
                    }
                    tokio::time::sleep(self.config.sleep_duration).await;
                }
            }
        }
        self.teardown().await;
        Ok(())
    }

    async fn tick(&mut self) -> ManagerResult<()> {
        self.heartbeat_tunnel().await?;

        let countries = tunnel::available_countries(&self.configs);
        self.backend.set_countries(&countries).await?;

        let pending = self.backend.list_pending_tests().await?;
        tracing::info!(count = pending.len(), "fetched pending tests");

        for test in pending {
            if let Err(e) = self.run_test(&test).await {
                tracing::warn!(test_id = %test.id, error = %e, "skipping test");
            }
        }

        Ok(())
    }

    async fn heartbeat_tunnel(&mut self) -> ManagerResult<()> {
        if tunnel::probe(&self.docker, &self.tunnel_container_id).await?.is_some() {
            return Ok(());
        }
        tracing::warn!("tunnel healthcheck failed, cycling through available configs");
        self.bring_up_first_available().await
    }

    async fn run_test(&mut self, test: &Test) -> ManagerResult<()> {
        let candidates = tunnel::candidates_for(&self.configs, &test.country_code);
        if candidates.is_empty() {
            tracing::info!(test_id = %test.id, country = %test.country_code, "no tunnel config for country, skipping");
            return Ok(());
        }

        let mut egress: Option<EgressDescriptor> = None;
        for candidate in &candidates {
            if let Some(descriptor) = tunnel::cycle_and_probe(
                &self.docker,
                &self.tunnel_container_id,
                &self.config.working_dir,
                candidate,
            )
            .await?
            {
                egress = Some(descriptor);
                break;
            }
        }
        let Some(egress) = egress else {
            tracing::info!(test_id = %test.id, "no healthy tunnel for this test's country, skipping");
            return Ok(());
        };

        let output_filename = format!("{}.json", test.id);
        let output_path = self.config.working_dir.join(&output_filename);
        let test_file_url = join_object_path(&test.mirror_url, &self.config.object_path)?;

        let exit_code = self
            .docker
            .run_and_wait(
                &format!("mirrorqa-task-{}", test.id),
                &self.config.task_worker_image,
                vec![
                    "run".to_string(),
                    test_file_url,
                    format!("--output=/data/{output_filename}"),
                ],
                vec![bind_mount(&self.host_working_dir, &self.config.working_dir.display().to_string())],
                Some(format!("container:{}", self.tunnel_container_id)),
            )
            .await?;
        tracing::debug!(test_id = %test.id, exit_code, "measurement task exited");

        let update = self.read_and_merge_output(&output_path, &egress);
        std::fs::remove_file(&output_path).ok();

        let update = update?;
        self.backend.patch_test(test.id, &update).await?;
        Ok(())
    }

    fn read_and_merge_output(&self, output_path: &PathBuf, egress: &EgressDescriptor) -> ManagerResult<TestUpdate> {
        let raw = std::fs::read_to_string(output_path)?;
        let metrics: mirrorqa_core::models::TaskMetrics = serde_json::from_str(&raw)
            .map_err(|e| ManagerError::Backend(format!("malformed task output: {e}")))?;

        Ok(TestUpdate {
            started_on: Some(metrics.started_on),
            error: metrics.error,
            isp: egress.organization.clone(),
            ip_address: Some(egress.ip.clone()),
            asn: None,
            city: egress.city.clone(),
            latency: Some(metrics.latency_s),
            download_size: Some(metrics.download_size_bytes as i64),
            duration: Some(metrics.duration_s),
            speed: Some(metrics.speed_bps),
            status: Some(match metrics.status {
                mirrorqa_core::models::TaskStatus::Succeeded => mirrorqa_core::models::TestStatus::Succeeded,
                mirrorqa_core::models::TaskStatus::Errored => mirrorqa_core::models::TestStatus::Errored,
            }),
        })
    }

    /// Tears down the tunnel container. Task containers are run synchronously
    /// and removed as soon as they exit (§4.6 step 4d), so none are ever live
    /// across a tick boundary for a signal to catch.
    async fn teardown(&mut self) {
        let _ = self.docker.stop(&self.tunnel_container_id).await;
        let _ = self.docker.remove(&self.tunnel_container_id).await;
    }
}

/// Appends `object_path`'s segments onto `mirror_url`'s own path, preserving
/// any subdirectory the mirror is rooted at instead of replacing it.
fn join_object_path(mirror_url: &str, object_path: &str) -> ManagerResult<String> {
    let mut url = url::Url::parse(mirror_url)
        .map_err(|e| ManagerError::Backend(format!("malformed mirror url {mirror_url}: {e}")))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| ManagerError::Backend(format!("mirror url {mirror_url} cannot be a base")))?;
        segments.pop_if_empty();
        segments.extend(object_path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_mirror_base_url_and_object_path() {
        assert_eq!(
            join_object_path("https://mirror.example/", "/test.bin").unwrap(),
            "https://mirror.example/test.bin"
        );
        assert_eq!(
            join_object_path("https://mirror.example", "test.bin").unwrap(),
            "https://mirror.example/test.bin"
        );
    }

    #[test]
    fn preserves_the_mirrors_own_subdirectory() {
        assert_eq!(
            join_object_path("https://mirror.example/kiwix/", "/test_content/test.bin").unwrap(),
            "https://mirror.example/kiwix/test_content/test.bin"
        );
    }

    #[test]
    fn rejects_a_malformed_mirror_url() {
        assert!(join_object_path("not-a-url", "test.bin").is_err());
    }
}
