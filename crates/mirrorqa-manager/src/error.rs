//! Error taxonomy for the worker manager runtime (C6).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no VPN configuration files found in working directory")]
    NoTunnelConfigs,

    #[error("backend request failed: {0}")]
    Backend(String),

    #[error("backend returned unauthorized")]
    Unauthorized,

    #[error("container runtime error: {0}")]
    Runtime(String),

    #[error("tunnel healthcheck failed against every available configuration")]
    TunnelUnhealthy,

    #[error("signing error: {0}")]
    Auth(#[from] mirrorqa_auth::error::AuthError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ManagerResult<T> = Result<T, ManagerError>;

impl From<bollard::errors::Error> for ManagerError {
    fn from(err: bollard::errors::Error) -> Self {
        ManagerError::Runtime(err.to_string())
    }
}

impl From<reqwest::Error> for ManagerError {
    fn from(err: reqwest::Error) -> Self {
        ManagerError::Backend(err.to_string())
    }
}
