//! Server configuration, loaded from environment variables.

use mirrorqa_core::duration::{duration_var, required_string_var, string_var, u32_var, ConfigError};
use std::time::Duration;

/// Configuration for the backend HTTP API.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Postgres connection string.
    pub database_url: String,

    /// HS256 signing key for worker bearer tokens.
    pub jwt_secret: String,

    /// Allowed clock skew between a worker and the server during the
    /// handshake (§4.3 rule 3).
    pub message_validity: Duration,

    /// Bearer token lifetime.
    pub token_expiry: Duration,

    /// Upper bound on `page_size` for `GET /tests`.
    pub max_page_size: u32,

    /// Window within which at least one SUCCEEDED Test must land for
    /// `/health-check` to report healthy.
    pub unhealthy_no_tests_duration: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables, applying the typed
    /// defaults from the environment variable reference.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: string_var("HOST", "0.0.0.0"),
            port: u32_var("PORT", 8080)? as u16,
            database_url: required_string_var("POSTGRES_URI")
                .or_else(|_| required_string_var("DATABASE_URL"))?,
            jwt_secret: required_string_var("JWT_SECRET")?,
            message_validity: duration_var("MESSAGE_VALIDITY_DURATION", Duration::from_secs(60))?,
            token_expiry: duration_var("TOKEN_EXPIRY_DURATION", Duration::from_secs(6 * 3600))?,
            max_page_size: u32_var("MAX_PAGE_SIZE", 20)?,
            unhealthy_no_tests_duration: duration_var(
                "UNHEALTHY_NO_TESTS_DURATION",
                Duration::from_secs(6 * 3600),
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_required_vars() {
        // POSTGRES_URI/JWT_SECRET are not guaranteed to be unset in the test
        // environment, so this only exercises the error path shape.
        let err = ConfigError::Missing("POSTGRES_URI".to_string());
        assert!(err.to_string().contains("POSTGRES_URI"));
    }
}
