//! Job coordinator: validates submissions, records the job, launches workers.

use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{self, TryStreamExt};
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::auth::Requester;
use crate::db::ResultStore;
use crate::error::{AppError, AppResult};
use crate::models::{Device, NewJob, Region, SubmitJobRequest};

use super::launcher::{LaunchError, LaunchReceipt, WorkerLauncher};
use super::worker::WorkerParams;

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Normalized URL carrying an explicit scheme.
    pub url: String,
    pub device: Device,
    /// Distinct regions in the order they were requested.
    pub regions: Vec<Region>,
}

/// Normalize a target URL, assuming `https://` when no scheme is given.
pub fn normalize_url(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("url is required".to_string()));
    }

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate)
        .map_err(|e| AppError::InvalidInput(format!("url '{}' is not valid: {}", trimmed, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::InvalidInput(format!(
            "url scheme '{}' is not supported; use http or https",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(AppError::InvalidInput(format!("url '{}' has no host", trimmed)));
    }

    Ok(candidate)
}

/// True when `raw` starts with `scheme://`. A `://` later in the path or
/// query does not count.
fn has_scheme(raw: &str) -> bool {
    match raw.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Validate a raw submission before any state is created.
pub fn validate_submission(request: &SubmitJobRequest) -> AppResult<Submission> {
    let url = normalize_url(request.url.as_deref().unwrap_or_default())?;

    let device = match request.device.as_deref() {
        None => {
            return Err(AppError::InvalidInput(
                "device is required ('desktop' or 'mobile')".to_string(),
            ));
        }
        Some(raw) => Device::parse(raw).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Invalid device '{}'. Supported devices: desktop, mobile",
                raw
            ))
        })?,
    };

    let tags = request
        .region
        .as_ref()
        .map(|input| input.tags())
        .unwrap_or_default();
    if tags.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one region is required".to_string(),
        ));
    }

    let mut regions = Vec::with_capacity(tags.len());
    let mut invalid = Vec::new();
    for tag in &tags {
        match Region::parse(tag) {
            Some(region) if !regions.contains(&region) => regions.push(region),
            Some(_) => {}
            None => invalid.push(tag.as_str()),
        }
    }

    if !invalid.is_empty() {
        let supported: Vec<&str> = Region::ALL.iter().map(Region::as_str).collect();
        return Err(AppError::InvalidInput(format!(
            "Invalid region(s) provided: {}. Supported regions: {}",
            invalid.join(", "),
            supported.join(", ")
        )));
    }

    Ok(Submission {
        url,
        device,
        regions,
    })
}

/// Regions launched before the first failure.
#[derive(Debug, Default)]
struct LaunchSummary {
    receipts: Vec<LaunchReceipt>,
}

/// The launch that stopped the fold.
#[derive(Debug)]
struct LaunchHalt {
    launched: usize,
    region: Region,
    error: LaunchError,
}

/// Creates jobs and starts one worker per requested region.
#[derive(Clone)]
pub struct JobCoordinator {
    store: Arc<dyn ResultStore>,
    launcher: Arc<dyn WorkerLauncher>,
}

impl JobCoordinator {
    pub fn new(store: Arc<dyn ResultStore>, launcher: Arc<dyn WorkerLauncher>) -> Self {
        Self { store, launcher }
    }

    /// Record a job and launch its workers.
    ///
    /// Returns once every launch has been attempted. The first launch failure
    /// stops further launches and marks the job FAILED; workers already
    /// started keep running.
    pub async fn submit(&self, submission: Submission, requester: Requester) -> AppResult<Uuid> {
        let job = self
            .store
            .insert_job(NewJob {
                url: submission.url,
                device: submission.device,
                regions: submission.regions,
                requester: requester.name,
                client_ip: requester.client_ip,
            })
            .await?;

        info!(
            job_id = %job.id,
            url = %job.url,
            device = %job.device,
            regions = job.regions.len(),
            requester = %job.requester,
            "Job created"
        );

        let params = job.regions.iter().map(|&region| WorkerParams {
            job_id: job.id,
            url: job.url.clone(),
            device: job.device,
            region,
        });

        match self.launch_all(params).await {
            Ok(summary) => {
                info!(job_id = %job.id, launched = summary.receipts.len(), "All workers launched");
                Ok(job.id)
            }
            Err(halt) => {
                error!(
                    job_id = %job.id,
                    region = %halt.region,
                    launched = halt.launched,
                    error = %halt.error,
                    "Worker launch failed; remaining regions skipped"
                );
                if let Err(e) = self.store.mark_job_failed(job.id, Utc::now()).await {
                    warn!(job_id = %job.id, error = %e, "Failed to mark job failed");
                }
                Err(AppError::Launch(format!(
                    "Failed to launch worker for region {}: {}",
                    halt.region, halt.error
                )))
            }
        }
    }

    /// Launch sequentially in order, short-circuiting on the first failure.
    async fn launch_all(
        &self,
        params: impl Iterator<Item = WorkerParams>,
    ) -> Result<LaunchSummary, LaunchHalt> {
        let launcher = &self.launcher;
        stream::iter(params.map(Ok::<_, LaunchHalt>))
            .try_fold(LaunchSummary::default(), |mut summary, params| async move {
                match launcher.launch(&params).await {
                    Ok(receipt) => {
                        summary.receipts.push(receipt);
                        Ok(summary)
                    }
                    Err(error) => Err(LaunchHalt {
                        launched: summary.receipts.len(),
                        region: params.region,
                        error,
                    }),
                }
            })
            .await
    }
}
