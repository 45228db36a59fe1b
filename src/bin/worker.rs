//! Audit worker process.
//!
//! Reads `JOB_ID`, `URL`, `DEVICE` and `REGION` from the environment, audits
//! the URL once, and exits 0 when the region result is COMPLETED, 1 otherwise.

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};

use perfprobe_lib::config::{ProcessEnv, WorkerConfig};
use perfprobe_lib::db::DbPool;
use perfprobe_lib::services::{AuditWorker, LighthouseCli, S3ArtifactStore, WorkerOutcome, WorkerParams};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    if let Err(e) = perfprobe_lib::init_tracing() {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let params = match WorkerParams::from_source(&ProcessEnv) {
        Ok(params) => params,
        Err(e) => {
            error!("Invalid worker parameters: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Without the store there is no row to record the outcome on
    let pool = match DbPool::new(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(job_id = %params.job_id, region = %params.region, "{}", e);
            return ExitCode::FAILURE;
        }
    };

    let artifacts = S3ArtifactStore::new(&config.storage);
    if config.environment.is_development() {
        if let Err(e) = artifacts.ensure_bucket_exists().await {
            warn!("{}", e);
        }
    }

    let worker = AuditWorker::new(
        Arc::new(pool),
        Arc::new(artifacts),
        Arc::new(LighthouseCli::new(config.lighthouse_bin.clone())),
        config.storage.category.clone(),
    );

    match worker.run(&params).await {
        WorkerOutcome::Completed { metrics, report_url, .. } => {
            info!(
                job_id = %params.job_id,
                region = %params.region,
                lcp = metrics.lcp,
                report_url = %report_url,
                "Worker finished"
            );
            ExitCode::SUCCESS
        }
        WorkerOutcome::Failed { reason } => {
            error!(job_id = %params.job_id, region = %params.region, reason = %reason, "Worker failed");
            ExitCode::FAILURE
        }
    }
}
