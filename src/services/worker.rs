//! Audit worker: audits one URL in one region and records the outcome.
//!
//! A worker owns exactly one region result row. It creates the row as
//! RUNNING, runs the audit, uploads both reports, and moves the row to a
//! terminal state. The caller decides the process exit code from the
//! returned [`WorkerOutcome`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{ConfigError, EnvSource};
use crate::db::ResultStore;
use crate::error::{AppError, AppResult};
use crate::models::{AuditMetrics, Device, Region, RegionCompletion};

use super::lighthouse::{AuditArtifacts, AuditRunner};
use super::storage::{artifact_key, ArtifactKind, ArtifactStore};

/// Execution parameters handed to a worker at launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerParams {
    pub job_id: Uuid,
    pub url: String,
    pub device: Device,
    pub region: Region,
}

impl WorkerParams {
    pub const JOB_ID_VAR: &'static str = "JOB_ID";
    pub const URL_VAR: &'static str = "URL";
    pub const DEVICE_VAR: &'static str = "DEVICE";
    pub const REGION_VAR: &'static str = "REGION";

    /// Environment variables that carry these parameters to a worker process.
    pub fn to_env(&self) -> Vec<(&'static str, String)> {
        vec![
            (Self::JOB_ID_VAR, self.job_id.to_string()),
            (Self::URL_VAR, self.url.clone()),
            (Self::DEVICE_VAR, self.device.as_str().to_string()),
            (Self::REGION_VAR, self.region.as_str().to_string()),
        ]
    }

    /// Read parameters from an environment, reporting every missing or
    /// malformed variable at once.
    pub fn from_source<S: EnvSource + ?Sized>(source: &S) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        let mut take = |key: &'static str| {
            let value = source.get(key);
            if value.is_none() {
                missing.push(key.to_string());
            }
            value
        };
        let job_id = take(Self::JOB_ID_VAR);
        let url = take(Self::URL_VAR);
        let device = take(Self::DEVICE_VAR);
        let region = take(Self::REGION_VAR);

        let job_id = job_id.and_then(|raw| {
            Uuid::parse_str(raw.trim())
                .map_err(|_| invalid.push(format!("JOB_ID must be a UUID (got '{}')", raw)))
                .ok()
        });
        let device = device.and_then(|raw| {
            Device::parse(&raw).or_else(|| {
                invalid.push(format!("DEVICE must be 'desktop' or 'mobile' (got '{}')", raw));
                None
            })
        });
        let region = region.and_then(|raw| {
            Region::parse(&raw).or_else(|| {
                invalid.push(format!("REGION is not a supported region (got '{}')", raw));
                None
            })
        });

        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }

        match (job_id, url, device, region) {
            (Some(job_id), Some(url), Some(device), Some(region)) if invalid.is_empty() => {
                Ok(Self {
                    job_id,
                    url: url.trim().to_string(),
                    device,
                    region,
                })
            }
            _ => Err(ConfigError::InvalidValues(invalid)),
        }
    }
}

/// What a worker run ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerOutcome {
    Completed {
        metrics: AuditMetrics,
        report_url: String,
        metrics_url: String,
    },
    Failed {
        reason: String,
    },
}

impl WorkerOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Dependencies of an audit worker.
#[derive(Clone)]
pub struct AuditWorker {
    store: Arc<dyn ResultStore>,
    artifacts: Arc<dyn ArtifactStore>,
    auditor: Arc<dyn AuditRunner>,
    category: String,
}

impl AuditWorker {
    pub fn new(
        store: Arc<dyn ResultStore>,
        artifacts: Arc<dyn ArtifactStore>,
        auditor: Arc<dyn AuditRunner>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            store,
            artifacts,
            auditor,
            category: category.into(),
        }
    }

    /// Audit one (job, region) pair to a terminal state.
    pub async fn run(&self, params: &WorkerParams) -> WorkerOutcome {
        let row = match self
            .store
            .create_region_result(params.job_id, params.region)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                error!(
                    job_id = %params.job_id,
                    region = %params.region,
                    error = %e,
                    "Failed to create region result"
                );
                return WorkerOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        info!(
            job_id = %params.job_id,
            region = %params.region,
            url = %params.url,
            device = %params.device,
            "Starting audit"
        );

        match self.audit(params).await {
            Ok(completion) => {
                let outcome = WorkerOutcome::Completed {
                    metrics: completion.metrics,
                    report_url: completion.report_url.clone(),
                    metrics_url: completion.metrics_url.clone(),
                };
                match self.store.complete_region_result(row.id, completion).await {
                    Ok(_) => {
                        info!(job_id = %params.job_id, region = %params.region, "Audit completed");
                        outcome
                    }
                    Err(e) => self.fail(params, row.id, e).await,
                }
            }
            Err(e) => self.fail(params, row.id, e).await,
        }
    }

    /// Run the audit and publish both reports.
    async fn audit(&self, params: &WorkerParams) -> AppResult<RegionCompletion> {
        let AuditArtifacts { html, json } = self.auditor.run(&params.url, params.device).await?;

        // Fail before uploading anything if the report is unusable
        let metrics = AuditMetrics::from_report_json(&json)?;

        let (report_url, metrics_url) = self
            .publish(params, Utc::now().timestamp_millis(), html, json)
            .await?;

        Ok(RegionCompletion {
            metrics,
            report_url,
            metrics_url,
            completed_at: Utc::now(),
        })
    }

    /// Key prefix owned by this worker: `{category}/{job_id}/{region}`.
    ///
    /// Regions of one job audit the same URL and may upload within the same
    /// millisecond, so the prefix keeps their keys apart.
    fn key_prefix(&self, params: &WorkerParams) -> String {
        format!("{}/{}/{}", self.category, params.job_id, params.region)
    }

    /// Upload both renderings under one timestamp; returns (html, json) URLs.
    async fn publish(
        &self,
        params: &WorkerParams,
        epoch_millis: i64,
        html: String,
        json: String,
    ) -> AppResult<(String, String)> {
        let prefix = self.key_prefix(params);
        let html_key = artifact_key(&prefix, &params.url, epoch_millis, ArtifactKind::HtmlReport);
        let json_key = artifact_key(&prefix, &params.url, epoch_millis, ArtifactKind::JsonReport);

        let report_url = self
            .artifacts
            .put(&html_key, html.into_bytes(), ArtifactKind::HtmlReport.content_type())
            .await?;
        let metrics_url = self
            .artifacts
            .put(&json_key, json.into_bytes(), ArtifactKind::JsonReport.content_type())
            .await?;

        Ok((report_url, metrics_url))
    }

    async fn fail(&self, params: &WorkerParams, result_id: Uuid, cause: AppError) -> WorkerOutcome {
        error!(
            job_id = %params.job_id,
            region = %params.region,
            error = %cause,
            "Audit failed"
        );

        if let Err(e) = self.store.fail_region_result(result_id, Utc::now()).await {
            warn!(
                job_id = %params.job_id,
                region = %params.region,
                error = %e,
                "Failed to mark region result failed"
            );
        }

        WorkerOutcome::Failed {
            reason: cause.to_string(),
        }
    }
}
