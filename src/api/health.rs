//! Liveness and readiness probes.
//!
//! Liveness never touches a dependency. Readiness pings the result store and
//! reports how long the ping took, so load balancers and operators see the
//! same picture.

use std::time::Instant;

use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::ResultStore;
use crate::error::ErrorResponse;

/// Liveness payload.
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: String,
}

/// Outcome of probing one dependency.
#[derive(Serialize, ToSchema)]
pub struct DependencyCheck {
    name: &'static str,
    healthy: bool,
    latency_ms: u64,
}

/// Readiness payload.
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    status: &'static str,
    checks: Vec<DependencyCheck>,
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Process is up", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness: 200 once the result store answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/api/v1/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Dependencies reachable", body = ReadyResponse),
        (status = 503, description = "Result store unavailable", body = ErrorResponse)
    )
)]
#[get("/ready")]
pub async fn ready(store: web::Data<dyn ResultStore>) -> HttpResponse {
    let started = Instant::now();
    let ping = store.ping().await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match ping {
        Ok(()) => HttpResponse::Ok().json(ReadyResponse {
            status: "ready",
            checks: vec![DependencyCheck {
                name: "result_store",
                healthy: true,
                latency_ms,
            }],
        }),
        Err(e) => {
            tracing::warn!(error = %e, latency_ms, "Readiness probe failed");
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "NOT_READY".to_string(),
                message: "Result store unavailable".to_string(),
            })
        }
    }
}

pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready);
}
