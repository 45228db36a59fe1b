//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Perfprobe",
        version = "0.1.0",
        description = "Multi-region Lighthouse performance audits: submit a URL, poll for per-region results"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        api::health::health,
        api::health::ready,
        api::jobs::submit_job,
        api::jobs::get_job,
    ),
    components(
        schemas(
            error::ErrorResponse,
            api::health::HealthResponse,
            api::health::ReadyResponse,
            api::health::DependencyCheck,
            models::Region,
            models::Device,
            models::JobStatus,
            models::AuditMetrics,
            models::RegionInput,
            models::SubmitJobRequest,
            models::SubmitJobResponse,
            models::RegionResultResponse,
            models::JobStatusResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Jobs", description = "Audit job submission and status")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add API key security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new(crate::config::API_KEY_HEADER),
                    ),
                ),
            );
        }
    }
}
