//! Manager configuration, loaded from environment variables (§6).

use crate::error::{ManagerError, ManagerResult};
use mirrorqa_core::duration::{duration_var, required_string_var, string_var};
use std::path::PathBuf;
use std::time::Duration;

pub struct ManagerConfig {
    pub worker_id: String,
    pub backend_api_uri: String,
    pub private_key_file: PathBuf,
    pub working_dir: PathBuf,
    pub sleep_duration: Duration,
    pub requests_timeout: Duration,
    pub wireguard_image: String,
    pub task_worker_image: String,
    pub object_path: String,
}

impl ManagerConfig {
    pub fn from_env(worker_id: String) -> ManagerResult<Self> {
        Ok(Self {
            worker_id,
            backend_api_uri: required_string_var("BACKEND_API_URI")
                .map_err(|e| ManagerError::Config(e.to_string()))?,
            private_key_file: PathBuf::from(
                required_string_var("PRIVATE_KEY_FILE")
                    .map_err(|e| ManagerError::Config(e.to_string()))?,
            ),
            working_dir: PathBuf::from(string_var("WORKING_DIR", "/data")),
            sleep_duration: duration_var("SLEEP_DURATION", Duration::from_secs(3600))
                .map_err(|e| ManagerError::Config(e.to_string()))?,
            requests_timeout: duration_var("REQUESTS_TIMEOUT_DURATION", Duration::from_secs(10))
                .map_err(|e| ManagerError::Config(e.to_string()))?,
            wireguard_image: string_var("WIREGUARD_IMAGE", "ghcr.io/kiwix/mirrors-qa-wireguard:latest"),
            task_worker_image: string_var("TASK_WORKER_IMAGE", "ghcr.io/kiwix/mirrors-qa-worker:latest"),
            object_path: string_var("OBJECT_PATH", "/test_content/test.bin"),
        })
    }
}
