//! Local launcher: one worker child process per region.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::services::worker::WorkerParams;

use super::{LaunchError, LaunchReceipt, WorkerLauncher};

/// Spawns the worker binary on this host, for development.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    worker_bin: PathBuf,
}

impl ProcessLauncher {
    pub fn new(worker_bin: impl Into<PathBuf>) -> Self {
        Self {
            worker_bin: worker_bin.into(),
        }
    }
}

#[async_trait]
impl WorkerLauncher for ProcessLauncher {
    async fn launch(&self, params: &WorkerParams) -> Result<LaunchReceipt, LaunchError> {
        let mut child = Command::new(&self.worker_bin)
            .envs(params.to_env())
            .stdin(Stdio::null())
            .spawn()?;

        let pid = child
            .id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "exited".to_string());

        info!(
            job_id = %params.job_id,
            region = %params.region,
            pid = %pid,
            "Worker process started"
        );

        // Reap the child so it does not linger as a zombie
        let job_id = params.job_id;
        let region = params.region;
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    info!(job_id = %job_id, region = %region, "Worker process exited")
                }
                Ok(status) => {
                    warn!(job_id = %job_id, region = %region, status = %status, "Worker process failed")
                }
                Err(e) => warn!(job_id = %job_id, region = %region, error = %e, "Failed to wait on worker"),
            }
        });

        Ok(LaunchReceipt {
            region: params.region,
            handle: format!("pid:{}", pid),
        })
    }
}
