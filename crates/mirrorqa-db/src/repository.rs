//! Registry store (C1): transactional operations over Country, Region,
//! Mirror, Worker and Test, plus the mirror reconciler (C2).

use crate::error::{DbError, DbResult};
use crate::models::{CountryRow, MirrorRow, RegionRow, TestRow, WorkerRow};
use crate::pool::Pool;
use chrono::{DateTime, Duration, Utc};
use mirrorqa_core::models::{
    Country, CrawledMirror, Mirror, Page, PageMetadata, ReconcileCounts, Region, Test,
    TestFilter, TestSortColumn, TestStatus, TestUpdate, Worker,
};
use sqlx::PgConnection;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Handle to the relational registry store.
///
/// Every mutating operation runs in its own transaction; the store holds no
/// in-process state beyond the connection pool, so the scheduler and
/// reconciler are trivially testable against an ephemeral database.
#[derive(Clone)]
pub struct Registry {
    pool: Pool,
}

impl Registry {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    // ---- Region ---------------------------------------------------------

    pub async fn get_region(&self, code: &str) -> DbResult<Option<Region>> {
        let row: Option<RegionRow> = sqlx::query_as("SELECT code, name FROM regions WHERE code = $1")
            .bind(code)
            .fetch_optional(self.pool.inner())
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn create_region(&self, code: &str, name: &str) -> DbResult<Region> {
        let row: RegionRow = sqlx::query_as(
            r#"
            INSERT INTO regions (code, name) VALUES ($1, $2)
            ON CONFLICT (code) DO UPDATE SET name = excluded.name
            RETURNING code, name
            "#,
        )
        .bind(code)
        .bind(name)
        .fetch_one(self.pool.inner())
        .await?;
        Ok(row.into())
    }

    // ---- Country ----------------------------------------------------------

    pub async fn get_country(&self, code: &str) -> DbResult<Option<Country>> {
        let row: Option<CountryRow> = sqlx::query_as(
            "SELECT code, name, region_code FROM countries WHERE code = $1",
        )
        .bind(code.to_ascii_lowercase())
        .fetch_optional(self.pool.inner())
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn create_country(
        &self,
        code: &str,
        name: &str,
        region_code: Option<&str>,
    ) -> DbResult<Country> {
        let code = code.to_ascii_lowercase();
        let row: CountryRow = sqlx::query_as(
            r#"
            INSERT INTO countries (code, name, region_code) VALUES ($1, $2, $3)
            ON CONFLICT (code) DO UPDATE SET name = excluded.name, region_code = excluded.region_code
            RETURNING code, name, region_code
            "#,
        )
        .bind(&code)
        .bind(name)
        .bind(region_code)
        .fetch_one(self.pool.inner())
        .await?;
        Ok(row.into())
    }

    // ---- Mirror -------------------------------------------------------

    pub async fn list_enabled_mirrors(&self) -> DbResult<Vec<Mirror>> {
        let rows: Vec<MirrorRow> = sqlx::query_as(
            r#"
            SELECT id, base_url, enabled, country_code, region_code, asn, score,
                   latitude, longitude, country_only, region_only, as_only
            FROM mirrors WHERE enabled = true
            "#,
        )
        .fetch_all(self.pool.inner())
        .await?;

        let mut mirrors = Vec::with_capacity(rows.len());
        for row in rows {
            let others = self.other_countries_for(&row.id).await?;
            mirrors.push(row.into_mirror(others));
        }
        Ok(mirrors)
    }

    pub async fn get_mirror_by_id(&self, id: &str) -> DbResult<Option<Mirror>> {
        let row: Option<MirrorRow> = sqlx::query_as(
            r#"
            SELECT id, base_url, enabled, country_code, region_code, asn, score,
                   latitude, longitude, country_only, region_only, as_only
            FROM mirrors WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.inner())
        .await?;

        match row {
            Some(row) => {
                let others = self.other_countries_for(&row.id).await?;
                Ok(Some(row.into_mirror(others)))
            }
            None => Ok(None),
        }
    }

    async fn other_countries_for(&self, mirror_id: &str) -> DbResult<BTreeSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT country_code FROM mirror_other_countries WHERE mirror_id = $1",
        )
        .bind(mirror_id)
        .fetch_all(self.pool.inner())
        .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }

    pub async fn set_mirror_enabled(&self, id: &str, enabled: bool) -> DbResult<()> {
        sqlx::query("UPDATE mirrors SET enabled = $2 WHERE id = $1")
            .bind(id)
            .bind(enabled)
            .execute(self.pool.inner())
            .await?;
        Ok(())
    }

    /// Reconcile the registry against a freshly crawled mirror list (C2).
    ///
    /// Runs in a single transaction. Rejects empty input defensively so a
    /// transient crawl failure can never disable the whole registry.
    pub async fn reconcile_mirrors(&self, fresh: &[CrawledMirror]) -> DbResult<ReconcileCounts> {
        if fresh.is_empty() {
            return Err(DbError::EmptyInput);
        }

        let mut tx = self.pool.inner().begin().await?;

        let fresh_by_id: HashMap<&str, &CrawledMirror> =
            fresh.iter().map(|m| (m.id.as_str(), m)).collect();

        let existing: Vec<(String, bool)> =
            sqlx::query_as("SELECT id, enabled FROM mirrors")
                .fetch_all(&mut *tx)
                .await?;
        let existing_by_id: HashMap<&str, bool> =
            existing.iter().map(|(id, enabled)| (id.as_str(), *enabled)).collect();

        let mut counts = ReconcileCounts::default();

        for (id, mirror) in fresh_by_id.iter() {
            if let Some(country_code) = &mirror.country_code {
                ensure_country_exists(&mut tx, country_code).await?;
            }
            for country_code in &mirror.other_countries {
                ensure_country_exists(&mut tx, country_code).await?;
            }

            match existing_by_id.get(*id) {
                None => {
                    upsert_mirror(&mut tx, mirror, true).await?;
                    counts.added += 1;
                }
                Some(was_enabled) => {
                    if !*was_enabled {
                        counts.added += 1;
                    }
                    upsert_mirror(&mut tx, mirror, true).await?;
                }
            }
        }

        for id in existing_by_id.keys() {
            if !fresh_by_id.contains_key(*id) {
                sqlx::query("UPDATE mirrors SET enabled = false WHERE id = $1")
                    .bind(*id)
                    .execute(&mut *tx)
                    .await?;
                counts.disabled += 1;
            }
        }

        tx.commit().await?;
        Ok(counts)
    }

    // ---- Worker ---------------------------------------------------------

    pub async fn get_worker(&self, id: &str) -> DbResult<Option<Worker>> {
        let row: Option<WorkerRow> = sqlx::query_as(
            "SELECT id, pubkey_pem, pubkey_fingerprint, last_seen_on FROM workers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.inner())
        .await?;

        match row {
            Some(row) => {
                let countries = self.countries_for_worker(&row.id).await?;
                Ok(Some(row.into_worker(countries)))
            }
            None => Ok(None),
        }
    }

    async fn countries_for_worker(&self, worker_id: &str) -> DbResult<BTreeSet<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT country_code FROM worker_countries WHERE worker_id = $1")
                .bind(worker_id)
                .fetch_all(self.pool.inner())
                .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }

    pub async fn create_worker(
        &self,
        id: &str,
        pubkey_pem: &str,
        pubkey_fingerprint: &str,
        countries: &BTreeSet<String>,
    ) -> DbResult<Worker> {
        let mut tx = self.pool.inner().begin().await?;

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM workers WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(DbError::DuplicateKey(format!("worker {id} already exists")));
        }

        sqlx::query(
            "INSERT INTO workers (id, pubkey_pem, pubkey_fingerprint, last_seen_on) VALUES ($1, $2, $3, '1970-01-01T00:00:00Z')",
        )
        .bind(id)
        .bind(pubkey_pem)
        .bind(pubkey_fingerprint)
        .execute(&mut *tx)
        .await?;

        for country in countries {
            ensure_country_exists(&mut tx, country).await?;
            sqlx::query(
                "INSERT INTO worker_countries (worker_id, country_code) VALUES ($1, $2)",
            )
            .bind(id)
            .bind(country)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_worker(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("worker {id}")))
    }

    /// Replaces the worker's country set, creating any Country rows that
    /// don't already exist so this matches the behavior of the HTTP
    /// `PUT /workers/{id}/countries` route rather than diverging from it.
    pub async fn set_worker_countries(&self, id: &str, countries: &BTreeSet<String>) -> DbResult<()> {
        let mut tx = self.pool.inner().begin().await?;

        sqlx::query("DELETE FROM worker_countries WHERE worker_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for country in countries {
            ensure_country_exists(&mut tx, country).await?;
            sqlx::query(
                "INSERT INTO worker_countries (worker_id, country_code) VALUES ($1, $2)",
            )
            .bind(id)
            .bind(country)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn touch_worker(&self, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE workers SET last_seen_on = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(self.pool.inner())
            .await?;
        Ok(())
    }

    /// Workers whose `last_seen_on` is older than `since`. Never-seen workers
    /// (epoch default) are treated as idle — the comparison uses the epoch as
    /// a lower bound, not a floor that excludes them.
    pub async fn get_idle_workers(&self, since: Duration) -> DbResult<Vec<Worker>> {
        let threshold = Utc::now() - since;
        let rows: Vec<WorkerRow> = sqlx::query_as(
            "SELECT id, pubkey_pem, pubkey_fingerprint, last_seen_on FROM workers WHERE last_seen_on < $1",
        )
        .bind(threshold)
        .fetch_all(self.pool.inner())
        .await?;

        let mut workers = Vec::with_capacity(rows.len());
        for row in rows {
            let countries = self.countries_for_worker(&row.id).await?;
            workers.push(row.into_worker(countries));
        }
        Ok(workers)
    }

    // ---- Test -------------------------------------------------------------

    pub async fn get_test(&self, id: Uuid) -> DbResult<Option<Test>> {
        let row: Option<TestRow> = sqlx::query_as(
            r#"
            SELECT id, requested_on, started_on, status, worker_id, mirror_url, country_code,
                   ip_address, asn, isp, city, latency_ms, download_size_bytes, duration_s,
                   speed_bps, error
            FROM tests WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(Test::try_from)
            .transpose()
            .map_err(DbError::ValidationError)
    }

    pub async fn create_test(
        &self,
        worker_id: &str,
        mirror_url: &str,
        country_code: &str,
    ) -> DbResult<Test> {
        let id = Uuid::new_v4();
        let row: TestRow = sqlx::query_as(
            r#"
            INSERT INTO tests (id, worker_id, mirror_url, country_code, status)
            VALUES ($1, $2, $3, $4, 'PENDING')
            RETURNING id, requested_on, started_on, status, worker_id, mirror_url, country_code,
                      ip_address, asn, isp, city, latency_ms, download_size_bytes, duration_s,
                      speed_bps, error
            "#,
        )
        .bind(id)
        .bind(worker_id)
        .bind(mirror_url)
        .bind(country_code)
        .fetch_one(self.pool.inner())
        .await?;
        Test::try_from(row).map_err(DbError::ValidationError)
    }

    pub async fn count_pending_tests_for_worker(&self, worker_id: &str) -> DbResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT count(*) FROM tests WHERE worker_id = $1 AND status = 'PENDING'",
        )
        .bind(worker_id)
        .fetch_one(self.pool.inner())
        .await?;
        Ok(count)
    }

    pub async fn update_test(&self, id: Uuid, update: &TestUpdate) -> DbResult<Test> {
        let row: TestRow = sqlx::query_as(
            r#"
            UPDATE tests SET
                started_on = COALESCE($2, started_on),
                error = COALESCE($3, error),
                isp = COALESCE($4, isp),
                ip_address = COALESCE($5, ip_address),
                asn = COALESCE($6, asn),
                city = COALESCE($7, city),
                latency_ms = COALESCE($8, latency_ms),
                download_size_bytes = COALESCE($9, download_size_bytes),
                duration_s = COALESCE($10, duration_s),
                speed_bps = COALESCE($11, speed_bps),
                status = COALESCE($12, status)
            WHERE id = $1
            RETURNING id, requested_on, started_on, status, worker_id, mirror_url, country_code,
                      ip_address, asn, isp, city, latency_ms, download_size_bytes, duration_s,
                      speed_bps, error
            "#,
        )
        .bind(id)
        .bind(update.started_on)
        .bind(&update.error)
        .bind(&update.isp)
        .bind(&update.ip_address)
        .bind(update.asn)
        .bind(&update.city)
        .bind(update.latency)
        .bind(update.download_size)
        .bind(update.duration)
        .bind(update.speed)
        .bind(update.status.map(|s| s.as_str()))
        .fetch_optional(self.pool.inner())
        .await?
        .ok_or_else(|| DbError::NotFound(format!("test {id}")))?;

        Test::try_from(row).map_err(DbError::ValidationError)
    }

    /// Expire Tests that have been PENDING past `older_than`. Returns the
    /// set newly transitioned to MISSED.
    pub async fn expire_tests(&self, older_than: Duration) -> DbResult<Vec<Test>> {
        let threshold = Utc::now() - older_than;
        let rows: Vec<TestRow> = sqlx::query_as(
            r#"
            UPDATE tests SET status = 'MISSED'
            WHERE status = 'PENDING' AND requested_on < $1
            RETURNING id, requested_on, started_on, status, worker_id, mirror_url, country_code,
                      ip_address, asn, isp, city, latency_ms, download_size_bytes, duration_s,
                      speed_bps, error
            "#,
        )
        .bind(threshold)
        .fetch_all(self.pool.inner())
        .await?;

        rows.into_iter()
            .map(Test::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::ValidationError)
    }

    pub async fn list_tests(
        &self,
        filter: &TestFilter,
        page: Page,
        sort_by: Option<TestSortColumn>,
        order_desc: bool,
    ) -> DbResult<(Vec<Test>, PageMetadata)> {
        let mut conditions = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        if let Some(worker_id) = &filter.worker_id {
            binds.push(worker_id.clone());
            conditions.push(format!("worker_id = ${}", binds.len()));
        }
        if let Some(country_code) = &filter.country_code {
            binds.push(country_code.clone());
            conditions.push(format!("country_code = ${}", binds.len()));
        }
        if !filter.statuses.is_empty() {
            let placeholders: Vec<String> = filter
                .statuses
                .iter()
                .map(|s| {
                    binds.push(s.as_str().to_string());
                    format!("${}", binds.len())
                })
                .collect();
            conditions.push(format!("status IN ({})", placeholders.join(", ")));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let order_col = match sort_by {
            Some(TestSortColumn::RequestedOn) | None => None,
            Some(TestSortColumn::StartedOn) => Some("started_on"),
            Some(TestSortColumn::Status) => Some("status"),
            Some(TestSortColumn::WorkerId) => Some("worker_id"),
            Some(TestSortColumn::CountryCode) => Some("country_code"),
            Some(TestSortColumn::City) => Some("city"),
        };
        let direction = if order_desc { "DESC" } else { "ASC" };
        // requested_on asc is always the stable tiebreaker; when the client
        // picks a different column that column takes precedence.
        let order_clause = match order_col {
            Some(col) => format!("ORDER BY {col} {direction}, requested_on ASC"),
            None => format!("ORDER BY requested_on {direction}"),
        };

        let count_sql = format!("SELECT count(*) FROM tests {where_clause}");
        let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
        for b in &binds {
            count_query = count_query.bind(b);
        }
        let (total,): (i64,) = count_query.fetch_one(self.pool.inner()).await?;

        if total == 0 {
            return Ok((Vec::new(), PageMetadata::empty()));
        }

        let limit_idx = binds.len() + 1;
        let offset_idx = binds.len() + 2;
        let list_sql = format!(
            r#"
            SELECT id, requested_on, started_on, status, worker_id, mirror_url, country_code,
                   ip_address, asn, isp, city, latency_ms, download_size_bytes, duration_s,
                   speed_bps, error
            FROM tests {where_clause} {order_clause} LIMIT ${limit_idx} OFFSET ${offset_idx}
            "#
        );
        let mut list_query = sqlx::query_as::<_, TestRow>(&list_sql);
        for b in &binds {
            list_query = list_query.bind(b);
        }
        let offset = (page.page_num.saturating_sub(1)) as i64 * page.page_size as i64;
        list_query = list_query.bind(page.page_size as i64).bind(offset);

        let rows = list_query.fetch_all(self.pool.inner()).await?;
        let tests = rows
            .into_iter()
            .map(Test::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::ValidationError)?;

        let metadata = PageMetadata::new(total as u64, page);
        Ok((tests, metadata))
    }

    pub async fn has_recent_success(&self, within: Duration) -> DbResult<bool> {
        let threshold = Utc::now() - within;
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM tests WHERE status = 'SUCCEEDED' AND started_on >= $1 LIMIT 1",
        )
        .bind(threshold)
        .fetch_optional(self.pool.inner())
        .await?;
        Ok(row.is_some())
    }
}

/// Creates the Country row for `code` if it doesn't already exist, using the
/// bundled ISO table for its name. Lets the reconciler and worker-country
/// assignment attach a Country inline instead of failing their FK on the
/// first mirror or worker to reference a country that hasn't been imported.
async fn ensure_country_exists(tx: &mut PgConnection, code: &str) -> DbResult<()> {
    let name = mirrorqa_core::iso_countries::lookup(code)
        .map(|c| c.name.to_string())
        .unwrap_or_else(|| code.to_ascii_uppercase());

    sqlx::query(
        "INSERT INTO countries (code, name) VALUES ($1, $2) ON CONFLICT (code) DO NOTHING",
    )
    .bind(code)
    .bind(name)
    .execute(&mut *tx)
    .await?;
    Ok(())
}

async fn upsert_mirror(
    tx: &mut PgConnection,
    mirror: &CrawledMirror,
    enabled: bool,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO mirrors (
            id, base_url, enabled, country_code, region_code, asn, score,
            latitude, longitude, country_only, region_only, as_only
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (id) DO UPDATE SET
            base_url = excluded.base_url,
            enabled = excluded.enabled,
            country_code = excluded.country_code,
            region_code = excluded.region_code,
            asn = excluded.asn,
            score = excluded.score,
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            country_only = excluded.country_only,
            region_only = excluded.region_only,
            as_only = excluded.as_only
        "#,
    )
    .bind(&mirror.id)
    .bind(&mirror.base_url)
    .bind(enabled)
    .bind(&mirror.country_code)
    .bind(&mirror.region_code)
    .bind(mirror.asn)
    .bind(mirror.score)
    .bind(mirror.latitude)
    .bind(mirror.longitude)
    .bind(mirror.country_only)
    .bind(mirror.region_only)
    .bind(mirror.as_only)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM mirror_other_countries WHERE mirror_id = $1")
        .bind(&mirror.id)
        .execute(&mut *tx)
        .await?;
    for country in &mirror.other_countries {
        sqlx::query(
            "INSERT INTO mirror_other_countries (mirror_id, country_code) VALUES ($1, $2)",
        )
        .bind(&mirror.id)
        .bind(country)
        .execute(&mut *tx)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_metadata_is_zeroed() {
        let metadata = PageMetadata::empty();
        assert_eq!(metadata.total_records, 0);
        assert_eq!(metadata.page_size, 0);
        assert!(metadata.current_page.is_none());
    }

    #[test]
    fn page_metadata_computes_last_page() {
        let metadata = PageMetadata::new(25, Page { page_num: 1, page_size: 10 });
        assert_eq!(metadata.last_page, Some(3));
    }
}
