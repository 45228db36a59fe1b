//! API endpoint modules.

pub mod health;
pub mod jobs;
pub mod openapi;

use actix_web::web;

pub use health::configure_health_routes;
pub use jobs::configure_routes as configure_job_routes;
pub use openapi::ApiDoc;

/// Mount every versioned API route under `/api/v1`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .app_data(jobs::json_config())
            .configure(configure_health_routes)
            .configure(configure_job_routes),
    );
}
