//! Schema versioning for the registry store.
//!
//! Migrations are plain SQL, tracked in a `_migrations` table, applied in
//! order inside a transaction. Table/constraint names follow the project
//! convention (`ix_`, `uq_<table>_<col>`, `ck_<table>_<name>`,
//! `fk_<table>_<col>_<ref>`, `pk_<table>`).

use crate::error::{DbError, DbResult};
use crate::pool::Pool;
use chrono::{DateTime, Utc};

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

pub struct MigrationManager<'a> {
    pool: &'a Pool,
}

impl<'a> MigrationManager<'a> {
    pub fn new(pool: &'a Pool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> DbResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT NOT NULL CONSTRAINT pk__migrations PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(self.pool.inner())
        .await
        .map_err(|e| DbError::MigrationError(e.to_string()))?;
        Ok(())
    }

    pub async fn current_version(&self) -> DbResult<i64> {
        let row: Option<(Option<i64>,)> = sqlx::query_as("SELECT max(version) FROM _migrations")
            .fetch_optional(self.pool.inner())
            .await
            .map_err(|e| DbError::MigrationError(e.to_string()))?;
        Ok(row.and_then(|(v,)| v).unwrap_or(0))
    }

    pub async fn applied_migrations(&self) -> DbResult<Vec<(i64, String, DateTime<Utc>)>> {
        let rows: Vec<(i64, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT version, name, applied_at FROM _migrations ORDER BY version",
        )
        .fetch_all(self.pool.inner())
        .await
        .map_err(|e| DbError::MigrationError(e.to_string()))?;
        Ok(rows)
    }

    pub async fn apply(&self, migration: &Migration) -> DbResult<()> {
        let mut tx = self
            .pool
            .inner()
            .begin()
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))?;

        sqlx::query(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::MigrationError(format!("{}: {e}", migration.name)))?;

        sqlx::query("INSERT INTO _migrations (version, name) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::MigrationError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))?;
        Ok(())
    }

    pub async fn rollback(&self, migration: &Migration) -> DbResult<()> {
        let mut tx = self
            .pool
            .inner()
            .begin()
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))?;

        sqlx::query(migration.down)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::MigrationError(format!("{}: {e}", migration.name)))?;

        sqlx::query("DELETE FROM _migrations WHERE version = $1")
            .bind(migration.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::MigrationError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))?;
        Ok(())
    }

    pub async fn migrate(&self, migrations: &[Migration]) -> DbResult<()> {
        self.init().await?;
        let current = self.current_version().await?;
        for migration in migrations {
            if migration.version > current {
                self.apply(migration).await?;
            }
        }
        Ok(())
    }
}

pub fn default_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "create_regions_and_countries",
            up: r#"
                CREATE TABLE regions (
                    code TEXT NOT NULL CONSTRAINT pk_regions PRIMARY KEY,
                    name TEXT NOT NULL
                );

                CREATE TABLE countries (
                    code TEXT NOT NULL CONSTRAINT pk_countries PRIMARY KEY,
                    name TEXT NOT NULL,
                    region_code TEXT,
                    CONSTRAINT fk_countries_region_code_regions
                        FOREIGN KEY (region_code) REFERENCES regions (code),
                    CONSTRAINT ck_countries_code_lowercase CHECK (code = lower(code))
                );

                CREATE INDEX ix_countries_region_code ON countries (region_code);
            "#,
            down: "DROP TABLE countries; DROP TABLE regions;",
        },
        Migration {
            version: 2,
            name: "create_mirrors",
            up: r#"
                CREATE TABLE mirrors (
                    id TEXT NOT NULL CONSTRAINT pk_mirrors PRIMARY KEY,
                    base_url TEXT NOT NULL,
                    enabled BOOLEAN NOT NULL DEFAULT true,
                    country_code TEXT,
                    region_code TEXT,
                    asn BIGINT,
                    score BIGINT,
                    latitude DOUBLE PRECISION,
                    longitude DOUBLE PRECISION,
                    country_only BOOLEAN NOT NULL DEFAULT false,
                    region_only BOOLEAN NOT NULL DEFAULT false,
                    as_only BOOLEAN NOT NULL DEFAULT false,
                    CONSTRAINT uq_mirrors_base_url UNIQUE (base_url),
                    CONSTRAINT fk_mirrors_country_code_countries
                        FOREIGN KEY (country_code) REFERENCES countries (code) ON DELETE CASCADE,
                    CONSTRAINT fk_mirrors_region_code_regions
                        FOREIGN KEY (region_code) REFERENCES regions (code)
                );

                CREATE INDEX ix_mirrors_enabled ON mirrors (enabled);
                CREATE INDEX ix_mirrors_country_code ON mirrors (country_code);

                CREATE TABLE mirror_other_countries (
                    mirror_id TEXT NOT NULL,
                    country_code TEXT NOT NULL,
                    CONSTRAINT pk_mirror_other_countries PRIMARY KEY (mirror_id, country_code),
                    CONSTRAINT fk_mirror_other_countries_mirror_id_mirrors
                        FOREIGN KEY (mirror_id) REFERENCES mirrors (id) ON DELETE CASCADE,
                    CONSTRAINT fk_mirror_other_countries_country_code_countries
                        FOREIGN KEY (country_code) REFERENCES countries (code)
                );
            "#,
            down: "DROP TABLE mirror_other_countries; DROP TABLE mirrors;",
        },
        Migration {
            version: 3,
            name: "create_workers",
            up: r#"
                CREATE TABLE workers (
                    id TEXT NOT NULL CONSTRAINT pk_workers PRIMARY KEY,
                    pubkey_pem TEXT NOT NULL,
                    pubkey_fingerprint TEXT NOT NULL,
                    last_seen_on TIMESTAMPTZ NOT NULL DEFAULT '1970-01-01T00:00:00Z'
                );

                CREATE TABLE worker_countries (
                    worker_id TEXT NOT NULL,
                    country_code TEXT NOT NULL,
                    CONSTRAINT pk_worker_countries PRIMARY KEY (worker_id, country_code),
                    CONSTRAINT fk_worker_countries_worker_id_workers
                        FOREIGN KEY (worker_id) REFERENCES workers (id) ON DELETE CASCADE,
                    CONSTRAINT fk_worker_countries_country_code_countries
                        FOREIGN KEY (country_code) REFERENCES countries (code)
                );

                CREATE INDEX ix_workers_last_seen_on ON workers (last_seen_on);
            "#,
            down: "DROP TABLE worker_countries; DROP TABLE workers;",
        },
        Migration {
            version: 4,
            name: "create_tests",
            up: r#"
                CREATE TABLE tests (
                    id UUID NOT NULL CONSTRAINT pk_tests PRIMARY KEY,
                    requested_on TIMESTAMPTZ NOT NULL DEFAULT now(),
                    started_on TIMESTAMPTZ,
                    status TEXT NOT NULL DEFAULT 'PENDING',
                    worker_id TEXT NOT NULL,
                    mirror_url TEXT NOT NULL,
                    country_code TEXT NOT NULL,
                    ip_address TEXT,
                    asn BIGINT,
                    isp TEXT,
                    city TEXT,
                    latency_ms DOUBLE PRECISION,
                    download_size_bytes BIGINT,
                    duration_s DOUBLE PRECISION,
                    speed_bps DOUBLE PRECISION,
                    error TEXT,
                    CONSTRAINT fk_tests_worker_id_workers
                        FOREIGN KEY (worker_id) REFERENCES workers (id),
                    CONSTRAINT fk_tests_country_code_countries
                        FOREIGN KEY (country_code) REFERENCES countries (code),
                    CONSTRAINT ck_tests_status
                        CHECK (status IN ('PENDING', 'MISSED', 'SUCCEEDED', 'ERRORED'))
                );

                CREATE INDEX ix_tests_worker_id ON tests (worker_id);
                CREATE INDEX ix_tests_status ON tests (status);
                CREATE INDEX ix_tests_requested_on ON tests (requested_on);
                CREATE INDEX ix_tests_country_code ON tests (country_code);
            "#,
            down: "DROP TABLE tests;",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_migrations_are_ordered() {
        let migrations = default_migrations();
        let versions: Vec<i64> = migrations.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort();
        assert_eq!(versions, sorted);
    }
}
