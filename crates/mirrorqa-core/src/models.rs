//! Domain entities shared by the registry store, API surface and worker manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A continent grouping, e.g. `eu`, `af`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
}

/// ISO 3166-1 alpha-2 country, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
    pub name: String,
    pub region_code: Option<String>,
}

/// A mirror server, keyed by hostname.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mirror {
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
    pub other_countries: BTreeSet<String>,
}

/// A mirror as produced by crawling the upstream HTML listing (C2 input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawledMirror {
    pub id: String,
    pub base_url: String,
    pub country_code: Option<String>,
    pub region_code: Option<String>,
    pub asn: Option<i64>,
    pub score: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country_only: bool,
    pub region_only: bool,
    pub as_only: bool,
    pub other_countries: BTreeSet<String>,
}

/// A measurement agent installation identified by an RSA public key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub pubkey_pem: String,
    pub pubkey_fingerprint: String,
    pub last_seen_on: DateTime<Utc>,
    pub countries: BTreeSet<String>,
}

/// Status of a scheduled measurement. Stored as a CHECK-constrained string,
/// not a database-native enum, so new values can land via migration alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Pending,
    Missed,
    Succeeded,
    Errored,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pending => "PENDING",
            TestStatus::Missed => "MISSED",
            TestStatus::Succeeded => "SUCCEEDED",
            TestStatus::Errored => "ERRORED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TestStatus::Pending)
    }
}

impl std::str::FromStr for TestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TestStatus::Pending),
            "MISSED" => Ok(TestStatus::Missed),
            "SUCCEEDED" => Ok(TestStatus::Succeeded),
            "ERRORED" => Ok(TestStatus::Errored),
            other => Err(format!("unknown test status: {other}")),
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single scheduled measurement of one Mirror from one Country by one Worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: Uuid,
    pub requested_on: DateTime<Utc>,
    pub started_on: Option<DateTime<Utc>>,
    pub status: TestStatus,
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

/// Partial update applied by a worker via `PATCH /tests/{id}`.
///
/// Unset fields preserve existing values; set fields overwrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestUpdate {
    pub started_on: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub isp: Option<String>,
    pub ip_address: Option<String>,
    pub asn: Option<i64>,
    pub city: Option<String>,
    pub latency: Option<f64>,
    pub download_size: Option<i64>,
    pub duration: Option<f64>,
    pub speed: Option<f64>,
    pub status: Option<TestStatus>,
}

/// Filters accepted by `list_tests` / `GET /tests`.
#[derive(Debug, Clone, Default)]
pub struct TestFilter {
    pub worker_id: Option<String>,
    pub country_code: Option<String>,
    pub statuses: Vec<TestStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestSortColumn {
    RequestedOn,
    StartedOn,
    Status,
    WorkerId,
    CountryCode,
    City,
}

impl std::str::FromStr for TestSortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested_on" => Ok(Self::RequestedOn),
            "started_on" => Ok(Self::StartedOn),
            "status" => Ok(Self::Status),
            "worker_id" => Ok(Self::WorkerId),
            "country_code" => Ok(Self::CountryCode),
            "city" => Ok(Self::City),
            other => Err(format!("unknown sort column: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page_num: u32,
    pub page_size: u32,
}

/// Outcome of a single measurement attempt (C7), serialized as the output
/// file a measurement task leaves behind for the worker manager to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Succeeded,
    Errored,
}

/// The JSON record a measurement task writes to its `--output` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMetrics {
    pub started_on: DateTime<Utc>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_s: f64,
    pub download_size_bytes: u64,
    pub duration_s: f64,
    pub speed_bps: f64,
}

/// Result of a reconciliation pass (C2).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReconcileCounts {
    pub added: u64,
    pub disabled: u64,
}

/// Pagination metadata returned alongside a list of Tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMetadata {
    pub total_records: u64,
    pub page_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u64>,
}

impl PageMetadata {
    /// Per §6: when there are no records, only `{total_records: 0, page_size: 0}` is returned.
    pub fn empty() -> Self {
        Self {
            total_records: 0,
            page_size: 0,
            current_page: None,
            first_page: None,
            last_page: None,
        }
    }

    pub fn new(total_records: u64, page: Page) -> Self {
        if total_records == 0 {
            return Self::empty();
        }
        let page_size = page.page_size as u64;
        let last_page = total_records.div_ceil(page_size).max(1);
        Self {
            total_records,
            page_size,
            current_page: Some(page.page_num as u64),
            first_page: Some(1),
            last_page: Some(last_page),
        }
    }
}
