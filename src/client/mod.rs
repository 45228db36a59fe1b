//! Caller-side access to job status: a status source and the poller that
//! drives it until the job is terminal.

mod http;
mod poller;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::JobStatusResponse;

pub use http::HttpStatusSource;
pub use poller::{PollHandle, PollOutcome, PollerConfig, StatusPoller};

/// Why a poll stopped without a terminal job status.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The read never got a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode job status: {0}")]
    Decode(String),

    /// The polling task panicked or was aborted.
    #[error("poller task ended unexpectedly: {0}")]
    Aborted(String),
}

/// One side-effect-free read of a job's aggregated status.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn fetch(&self, job_id: Uuid) -> Result<JobStatusResponse, PollError>;
}
