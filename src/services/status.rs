//! Read-side job status aggregation.

use uuid::Uuid;

use crate::db::ResultStore;
use crate::error::AppResult;
use crate::models::JobStatusResponse;

/// Join a job with its region results. `None` when the job is unknown.
///
/// Pure read: the derived status is never written back.
pub async fn read_job_status(
    store: &dyn ResultStore,
    id: Uuid,
) -> AppResult<Option<JobStatusResponse>> {
    let Some(job) = store.get_job(id).await? else {
        return Ok(None);
    };
    let results = store.list_region_results(id).await?;
    Ok(Some(JobStatusResponse::assemble(job, results)))
}
