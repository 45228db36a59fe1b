//! Job domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::metrics::AuditMetrics;

/// Geographic region an audit can run in.
///
/// The set is closed: submissions naming anything else are rejected before a
/// job row is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum Region {
    #[serde(rename = "us-east-1")]
    UsEast1,
    #[serde(rename = "us-west-2")]
    UsWest2,
    #[serde(rename = "eu-west-1")]
    EuWest1,
    #[serde(rename = "ap-southeast-1")]
    ApSoutheast1,
    #[serde(rename = "eu-central-1")]
    EuCentral1,
}

impl Region {
    /// Every supported region, in allow-list order.
    pub const ALL: [Region; 5] = [
        Region::UsEast1,
        Region::UsWest2,
        Region::EuWest1,
        Region::ApSoutheast1,
        Region::EuCentral1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsEast1 => "us-east-1",
            Self::UsWest2 => "us-west-2",
            Self::EuWest1 => "eu-west-1",
            Self::ApSoutheast1 => "ap-southeast-1",
            Self::EuCentral1 => "eu-central-1",
        }
    }

    /// Parse a region tag, ignoring surrounding whitespace and case.
    pub fn parse(s: &str) -> Option<Self> {
        let tag = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|r| r.as_str() == tag)
    }

    /// Suffix used for per-region environment variables (`us-east-1` -> `US_EAST_1`).
    pub fn env_suffix(&self) -> String {
        self.as_str().to_ascii_uppercase().replace('-', "_")
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Device profile the audit emulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Desktop,
    Mobile,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Some(Self::Desktop),
            "mobile" => Some(Self::Mobile),
            _ => None,
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status shared by jobs and region results.
///
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(Self::Running),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted audit job.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: Uuid,
    /// Normalized target URL (always carries a scheme).
    pub url: String,
    pub device: Device,
    /// Requested regions in launch order.
    pub regions: Vec<Region>,
    pub requester: String,
    pub client_ip: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields the coordinator supplies when creating a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub url: String,
    pub device: Device,
    pub regions: Vec<Region>,
    pub requester: String,
    pub client_ip: Option<String>,
}

/// Outcome record of auditing one job in one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionResult {
    pub id: Uuid,
    pub job_id: Uuid,
    pub region: Region,
    pub status: JobStatus,
    /// Present only when `status` is `Completed`.
    pub metrics: Option<AuditMetrics>,
    pub report_url: Option<String>,
    pub metrics_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Terminal success payload a worker writes onto its region result.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCompletion {
    pub metrics: AuditMetrics,
    pub report_url: String,
    pub metrics_url: String,
    pub completed_at: DateTime<Utc>,
}

// ============================================================================
// API DTOs
// ============================================================================

/// Region list as submitted: either a JSON array or a comma-separated string.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RegionInput {
    List(Vec<String>),
    Csv(String),
}

impl RegionInput {
    /// Split into raw, trimmed, non-empty region tags.
    pub fn tags(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            Self::List(items) => items.iter().map(String::as_str).collect(),
            Self::Csv(csv) => csv.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Request to create an audit job.
///
/// Fields are optional at the wire level so missing values surface as
/// validation errors with a readable message.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitJobRequest {
    /// Target URL; `https://` is assumed when no scheme is given.
    #[serde(default)]
    pub url: Option<String>,
    /// `desktop` or `mobile`.
    #[serde(default)]
    pub device: Option<String>,
    /// Region tags as an array or comma-separated string.
    #[serde(default)]
    pub region: Option<RegionInput>,
}

/// Response after a job is created and its workers launched.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitJobResponse {
    pub id: Uuid,
}

/// Per-region entry in a job status response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegionResultResponse {
    pub id: Uuid,
    pub region: Region,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// HTML report URL (completed results only).
    pub report_url: Option<String>,
    /// JSON report URL (completed results only).
    pub metrics_url: Option<String>,
    pub metrics: Option<AuditMetrics>,
}

impl From<RegionResult> for RegionResultResponse {
    fn from(r: RegionResult) -> Self {
        Self {
            id: r.id,
            region: r.region,
            status: r.status,
            created_at: r.created_at,
            completed_at: r.completed_at,
            report_url: r.report_url,
            metrics_url: r.metrics_url,
            metrics: r.metrics,
        }
    }
}

/// Aggregated job status: the job row joined with its region results.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobStatusResponse {
    pub id: Uuid,
    /// Overall status derived from the job row and its region results.
    pub status: JobStatus,
    pub url: String,
    pub device: Device,
    pub regions: Vec<Region>,
    pub requester: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub results: Vec<RegionResultResponse>,
}

impl JobStatusResponse {
    /// Join a job with its region results.
    ///
    /// Results are ordered by the job's requested region order; rows for
    /// regions the job never asked for are dropped.
    pub fn assemble(job: Job, mut results: Vec<RegionResult>) -> Self {
        results.retain(|r| r.job_id == job.id && job.regions.contains(&r.region));
        results.sort_by_key(|r| job.regions.iter().position(|region| *region == r.region));

        let status = derive_overall_status(job.status, &job.regions, &results);
        let completed_at = match (job.completed_at, status.is_terminal()) {
            (Some(at), _) => Some(at),
            (None, true) => results.iter().filter_map(|r| r.completed_at).max(),
            (None, false) => None,
        };

        Self {
            id: job.id,
            status,
            url: job.url,
            device: job.device,
            regions: job.regions,
            requester: job.requester,
            created_at: job.created_at,
            completed_at,
            results: results.into_iter().map(Into::into).collect(),
        }
    }
}

/// Derive the externally reported job status.
///
/// A job the coordinator marked `Failed` stays failed. Otherwise the job is
/// terminal only once every requested region has a terminal result: all
/// completed means `Completed`, any failed region means `Failed`.
pub fn derive_overall_status(
    job_status: JobStatus,
    requested: &[Region],
    results: &[RegionResult],
) -> JobStatus {
    if job_status == JobStatus::Failed {
        return JobStatus::Failed;
    }

    let mut any_failed = false;
    for region in requested {
        match results.iter().find(|r| r.region == *region).map(|r| r.status) {
            None | Some(JobStatus::Running) => return JobStatus::Running,
            Some(JobStatus::Failed) => any_failed = true,
            Some(JobStatus::Completed) => {}
        }
    }

    if requested.is_empty() {
        job_status
    } else if any_failed {
        JobStatus::Failed
    } else {
        JobStatus::Completed
    }
}
