//! Job API handlers.

use actix_web::{HttpResponse, web};
use tracing::info;
use uuid::Uuid;

use crate::auth::Requester;
use crate::db::ResultStore;
use crate::error::{AppError, AppResult};
use crate::models::{JobStatusResponse, SubmitJobRequest, SubmitJobResponse};
use crate::services::{read_job_status, validate_submission, JobCoordinator};

/// Submit an audit job.
///
/// Validates the submission, records the job and launches one worker per
/// region before responding.
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    tag = "Jobs",
    request_body = SubmitJobRequest,
    responses(
        (status = 200, description = "Job created and workers launched", body = SubmitJobResponse),
        (status = 400, description = "Invalid url, device or region", body = crate::error::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 502, description = "A worker could not be launched; job marked FAILED", body = crate::error::ErrorResponse),
        (status = 500, description = "Persistence failure", body = crate::error::ErrorResponse),
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn submit_job(
    requester: Requester,
    coordinator: web::Data<JobCoordinator>,
    body: web::Json<SubmitJobRequest>,
) -> AppResult<HttpResponse> {
    let submission = validate_submission(&body)?;
    let id = coordinator.submit(submission, requester).await?;

    info!(job_id = %id, "Job submitted");

    Ok(HttpResponse::Ok().json(SubmitJobResponse { id }))
}

/// Get a job's aggregated status and per-region results.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    tag = "Jobs",
    params(
        ("id" = Uuid, Path, description = "Job UUID")
    ),
    responses(
        (status = 200, description = "Job status", body = JobStatusResponse),
        (status = 400, description = "Malformed job id", body = crate::error::ErrorResponse),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_job(
    store: web::Data<dyn ResultStore>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = Uuid::parse_str(&path.into_inner())?;

    let status = read_job_status(store.get_ref(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {}", id)))?;

    Ok(HttpResponse::Ok().json(status))
}

/// JSON body settings: malformed bodies answer with the standard error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            AppError::InvalidInput(format!("Invalid request body: {}", err)).into()
        })
}

/// Configure job routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/jobs").route(web::post().to(submit_job)))
        .service(web::resource("/jobs/{id}").route(web::get().to(get_job)));
}
