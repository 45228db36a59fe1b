//! Lighthouse audit execution.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::Device;

/// Chrome flags for running inside a container without a display.
const CHROME_FLAGS: &str = "--headless --disable-gpu --no-sandbox";

/// Raw outputs of one audit run.
#[derive(Debug, Clone)]
pub struct AuditArtifacts {
    /// Human-readable HTML report.
    pub html: String,
    /// Structured JSON report.
    pub json: String,
}

/// Runs a performance audit of a URL.
#[async_trait]
pub trait AuditRunner: Send + Sync {
    async fn run(&self, url: &str, device: Device) -> AppResult<AuditArtifacts>;
}

/// [`AuditRunner`] that shells out to the Lighthouse CLI.
#[derive(Debug, Clone)]
pub struct LighthouseCli {
    bin: PathBuf,
}

impl LighthouseCli {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    /// CLI arguments for one run writing `{output_base}.report.{html,json}`.
    fn args(url: &str, device: Device, output_base: &Path) -> Vec<String> {
        let mut args = vec![
            url.to_string(),
            "--output=html".to_string(),
            "--output=json".to_string(),
            format!("--output-path={}", output_base.display()),
            "--only-categories=performance".to_string(),
            format!("--chrome-flags={}", CHROME_FLAGS),
            "--quiet".to_string(),
        ];
        // Lighthouse emulates mobile unless told otherwise
        if device == Device::Desktop {
            args.push("--preset=desktop".to_string());
        }
        args
    }
}

#[async_trait]
impl AuditRunner for LighthouseCli {
    async fn run(&self, url: &str, device: Device) -> AppResult<AuditArtifacts> {
        let workdir = tempfile::tempdir()
            .map_err(|e| AppError::Audit(format!("Failed to create report directory: {}", e)))?;
        let output_base = workdir.path().join("report");

        debug!(url = %url, device = %device, bin = %self.bin.display(), "Starting Lighthouse");

        let output = tokio::process::Command::new(&self.bin)
            .args(Self::args(url, device, &output_base))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                AppError::Audit(format!(
                    "Failed to start Lighthouse '{}': {}",
                    self.bin.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Audit(format!(
                "Lighthouse exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(AuditArtifacts {
            html: read_report(workdir.path(), "html").await?,
            json: read_report(workdir.path(), "json").await?,
        })
    }
}

/// Read one report Lighthouse wrote next to `--output-path`.
async fn read_report(dir: &Path, ext: &str) -> AppResult<String> {
    let path = dir.join(format!("report.report.{}", ext));
    tokio::fs::read_to_string(&path).await.map_err(|e| {
        AppError::Audit(format!(
            "Lighthouse produced no {} report at {}: {}",
            ext,
            path.display(),
            e
        ))
    })
}
