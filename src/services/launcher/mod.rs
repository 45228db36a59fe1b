//! Compute launch backends for audit workers.
//!
//! The coordinator hands each region's [`WorkerParams`] to a
//! [`WorkerLauncher`]; a successful launch only means the worker was started,
//! not that its audit will succeed.

mod ecs;
mod process;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{LauncherKind, LauncherSettings};
use crate::models::Region;

use super::worker::WorkerParams;

pub use ecs::EcsLauncher;
pub use process::ProcessLauncher;

/// Proof that a worker was started for a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReceipt {
    pub region: Region,
    /// Backend-specific handle: a task ARN or a process id.
    pub handle: String,
}

/// Reasons a worker could not be started.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("no compute target configured for region {0}")]
    NoTarget(Region),

    #[error("compute backend rejected the launch: {0}")]
    Rejected(String),

    #[error("failed to spawn worker process: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Starts one audit worker for one region.
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    async fn launch(&self, params: &WorkerParams) -> Result<LaunchReceipt, LaunchError>;
}

/// Build the launcher selected in configuration.
pub async fn build_launcher(settings: &LauncherSettings) -> Arc<dyn WorkerLauncher> {
    match settings.kind {
        LauncherKind::Ecs => Arc::new(EcsLauncher::new(settings).await),
        LauncherKind::Process => Arc::new(ProcessLauncher::new(settings.worker_bin.clone())),
    }
}
