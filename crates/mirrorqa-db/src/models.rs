//! Row types mapping SQL results onto `mirrorqa_core` domain entities.

use chrono::{DateTime, Utc};
use mirrorqa_core::models::{Country, Mirror, Region, Test, TestStatus, Worker};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::str::FromStr;

#[derive(Debug, FromRow)]
pub struct RegionRow {
    pub code: String,
    pub name: String,
}

impl From<RegionRow> for Region {
    fn from(r: RegionRow) -> Self {
        Region {
            code: r.code,
            name: r.name,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CountryRow {
    pub code: String,
    pub name: String,
    pub region_code: Option<String>,
}

impl From<CountryRow> for Country {
    fn from(r: CountryRow) -> Self {
        Country {
            code: r.code,
            name: r.name,
            region_code: r.region_code,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct MirrorRow {
    pub id: String,
    pub base_url: String,
    pub enabled: bool,
    pub country_code: Option<String>,
    pub region_code: Option<String>,
    pub asn: Option<i64>,
    pub score: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country_only: bool,
    pub region_only: bool,
    pub as_only: bool,
}

impl MirrorRow {
    pub fn into_mirror(self, other_countries: BTreeSet<String>) -> Mirror {
        Mirror {
            id: self.id,
            base_url: self.base_url,
            enabled: self.enabled,
            country_code: self.country_code,
            region_code: self.region_code,
            asn: self.asn,
            score: self.score,
            latitude: self.latitude,
            longitude: self.longitude,
            country_only: self.country_only,
            region_only: self.region_only,
            as_only: self.as_only,
            other_countries,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct WorkerRow {
    pub id: String,
    pub pubkey_pem: String,
    pub pubkey_fingerprint: String,
    pub last_seen_on: DateTime<Utc>,
}

impl WorkerRow {
    pub fn into_worker(self, countries: BTreeSet<String>) -> Worker {
        Worker {
            id: self.id,
            pubkey_pem: self.pubkey_pem,
            pubkey_fingerprint: self.pubkey_fingerprint,
            last_seen_on: self.last_seen_on,
            countries,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct TestRow {
    pub id: uuid::Uuid,
    pub requested_on: DateTime<Utc>,
    pub started_on: Option<DateTime<Utc>>,
    pub status: String,
    pub worker_id: String,
    pub mirror_url: String,
    pub country_code: String,
    pub ip_address: Option<String>,
    pub asn: Option<i64>,
    pub isp: Option<String>,
    pub city: Option<String>,
    pub latency_ms: Option<f64>,
    pub download_size_bytes: Option<i64>,
    pub duration_s: Option<f64>,
    pub speed_bps: Option<f64>,
    pub error: Option<String>,
}

impl TryFrom<TestRow> for Test {
    type Error = String;

    fn try_from(r: TestRow) -> Result<Self, Self::Error> {
        Ok(Test {
            id: r.id,
            requested_on: r.requested_on,
            started_on: r.started_on,
            status: TestStatus::from_str(&r.status)?,
            worker_id: r.worker_id,
            mirror_url: r.mirror_url,
            country_code: r.country_code,
            ip_address: r.ip_address,
            asn: r.asn,
            isp: r.isp,
            city: r.city,
            latency_ms: r.latency_ms,
            download_size_bytes: r.download_size_bytes,
            duration_s: r.duration_s,
            speed_bps: r.speed_bps,
            error: r.error,
        })
    }
}
