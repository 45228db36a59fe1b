//! Domain models for the audit orchestrator.

pub mod job;
pub mod metrics;

// Re-export commonly used types
pub use job::{
    derive_overall_status, Device, Job, JobStatus, JobStatusResponse, NewJob, Region,
    RegionCompletion, RegionInput, RegionResult, RegionResultResponse, SubmitJobRequest,
    SubmitJobResponse,
};
pub use metrics::AuditMetrics;
