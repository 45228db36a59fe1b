//! Business logic services.

pub mod coordinator;
pub mod launcher;
pub mod lighthouse;
pub mod status;
pub mod storage;
pub mod worker;

pub use coordinator::{normalize_url, validate_submission, JobCoordinator, Submission};
pub use launcher::{build_launcher, LaunchError, LaunchReceipt, WorkerLauncher};
pub use lighthouse::{AuditArtifacts, AuditRunner, LighthouseCli};
pub use status::read_job_status;
pub use storage::{ArtifactStore, MemoryArtifactStore, S3ArtifactStore};
pub use worker::{AuditWorker, WorkerOutcome, WorkerParams};
