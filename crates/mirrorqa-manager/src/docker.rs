//! Thin wrapper over the Docker API for the two containers the manager
//! drives: the long-lived tunnel and the one-shot measurement task.

use crate::error::{ManagerError, ManagerResult};
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions, WaitContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::service::HostConfig;
use bollard::Docker;
use futures::StreamExt;

pub struct DockerRuntime {
    docker: Docker,
}

pub struct ExecOutput {
    pub exit_code: i64,
    pub stdout: String,
}

impl DockerRuntime {
    pub fn connect() -> ManagerResult<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }

    /// Host-side path backing a bind mount of our own container, so child
    /// containers we start can bind the same host path instead of a path
    /// nested inside our own mount namespace.
    pub async fn host_mount_path(&self, container_id: &str, destination: &str) -> ManagerResult<Option<String>> {
        let info = self.docker.inspect_container(container_id, None).await?;
        let mounts = info.mounts.unwrap_or_default();
        Ok(mounts
            .into_iter()
            .find(|m| m.destination.as_deref() == Some(destination))
            .and_then(|m| m.source))
    }

    pub async fn run_detached(
        &self,
        name: &str,
        image: &str,
        cmd: Option<Vec<String>>,
        binds: Vec<String>,
        cap_add: Vec<String>,
        network_mode: Option<String>,
    ) -> ManagerResult<String> {
        let config = Config {
            image: Some(image.to_string()),
            cmd,
            host_config: Some(HostConfig {
                binds: Some(binds),
                cap_add: Some(cap_add),
                network_mode,
                ..Default::default()
            }),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name,
                    platform: None,
                }),
                config,
            )
            .await?;

        self.docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await?;

        Ok(created.id)
    }

    pub async fn run_and_wait(
        &self,
        name: &str,
        image: &str,
        cmd: Vec<String>,
        binds: Vec<String>,
        network_mode: Option<String>,
    ) -> ManagerResult<i64> {
        let id = self
            .run_detached(name, image, Some(cmd), binds, Vec::new(), network_mode)
            .await?;

        let mut stream = self
            .docker
            .wait_container(&id, None::<WaitContainerOptions<String>>);
        let mut exit_code = -1;
        while let Some(result) = stream.next().await {
            match result {
                Ok(response) => exit_code = response.status_code,
                Err(e) => return Err(ManagerError::from(e)),
            }
        }

        self.remove(&id).await.ok();
        Ok(exit_code)
    }

    pub async fn exec(&self, container_id: &str, cmd: Vec<String>) -> ManagerResult<ExecOutput> {
        let exec = self
            .docker
            .create_exec(
                container_id,
                CreateExecOptions {
                    cmd: Some(cmd),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let mut stdout = String::new();
        if let StartExecResults::Attached { mut output, .. } =
            self.docker.start_exec(&exec.id, None).await?
        {
            while let Some(Ok(msg)) = output.next().await {
                stdout.push_str(&msg.to_string());
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        Ok(ExecOutput {
            exit_code: inspect.exit_code.unwrap_or(-1),
            stdout,
        })
    }

    pub async fn stop(&self, container_id: &str) -> ManagerResult<()> {
        self.docker
            .stop_container(container_id, Some(StopContainerOptions { t: 5 }))
            .await?;
        Ok(())
    }

    pub async fn remove(&self, container_id: &str) -> ManagerResult<()> {
        self.docker
            .remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }
}

pub fn bind_mount(host_path: &str, container_path: &str) -> String {
    format!("{host_path}:{container_path}")
}
