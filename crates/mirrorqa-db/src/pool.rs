//! Connection pool management with health checks.

use crate::error::{DbError, DbResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::postgres::PgPool;
use std::time::Duration;

/// Database connection pool configuration.
///
/// `POSTGRES_URI` is the sole required input; the remaining fields have
/// sane defaults and are only overridden by operators tuning a deployment.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl PoolConfig {
    pub fn from_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(3600),
        }
    }

    pub fn builder(database_url: impl Into<String>) -> PoolConfigBuilder {
        PoolConfigBuilder::new(database_url)
    }
}

pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            config: PoolConfig::from_url(database_url),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.config.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.config.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn build(self) -> PoolConfig {
        self.config
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Pool {
    inner: PgPool,
}

impl Pool {
    pub async fn new(config: PoolConfig) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(&config.database_url)
            .await
            .map_err(|e| DbError::PoolError(format!("failed to create pool: {e}")))?;

        Ok(Self { inner: pool })
    }

    pub async fn from_url(url: &str) -> DbResult<Self> {
        Self::new(PoolConfig::from_url(url)).await
    }

    pub fn inner(&self) -> &PgPool {
        &self.inner
    }

    pub async fn health_check(&self) -> DbResult<HealthStatus> {
        let start = std::time::Instant::now();

        sqlx::query("SELECT 1")
            .execute(&self.inner)
            .await
            .map_err(|e| DbError::PoolError(format!("health check failed: {e}")))?;

        Ok(HealthStatus {
            healthy: true,
            latency_ms: start.elapsed().as_millis() as u64,
            connections: self.inner.size(),
            idle_connections: self.inner.num_idle(),
        })
    }

    pub async fn close(self) {
        self.inner.close().await;
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.inner.size(),
            idle: self.inner.num_idle(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: u64,
    pub connections: u32,
    pub idle_connections: usize,
}

#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_builder() {
        let config = PoolConfig::builder("postgres://localhost/mirrorsqa")
            .max_connections(20)
            .build();

        assert_eq!(config.max_connections, 20);
        assert_eq!(config.database_url, "postgres://localhost/mirrorsqa");
    }
}
