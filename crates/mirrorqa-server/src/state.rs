//! Shared application state threaded through every request handler.

use crate::config::ServerConfig;
use mirrorqa_auth::JwtManager;
use mirrorqa_db::Registry;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(registry: Registry, config: ServerConfig) -> Result<Self, mirrorqa_auth::AuthError> {
        let jwt = JwtManager::new(
            config.jwt_secret.as_bytes(),
            "mirrors-qa-backend",
            chrono::Duration::from_std(config.token_expiry).unwrap_or(chrono::Duration::hours(6)),
        )?;
        Ok(Self {
            registry,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        })
    }

    pub fn message_validity(&self) -> Duration {
        self.config.message_validity
    }
}
