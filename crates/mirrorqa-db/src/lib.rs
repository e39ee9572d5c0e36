//! Relational registry store for the mirrors-qa control plane.
//!
//! Persists Country, Region, Mirror, Worker and Test with transactional
//! updates, and implements the mirror reconciliation algorithm (C2) as part
//! of the same store so it shares the store's connection pool and error
//! taxonomy.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use migrations::{default_migrations, Migration, MigrationManager};
pub use pool::{HealthStatus, Pool, PoolConfig, PoolStats};
pub use repository::Registry;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run all pending migrations against `pool`.
pub async fn init_database(pool: &Pool) -> DbResult<()> {
    let migrator = MigrationManager::new(pool);
    migrator.migrate(&default_migrations()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
