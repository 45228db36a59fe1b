//! Perfprobe API server - Main entry point.
//!
//! Hosts the job coordinator and the status endpoint.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, web};
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use perfprobe_lib::api::{self, ApiDoc};
use perfprobe_lib::auth::ApiKeys;
use perfprobe_lib::config::{LauncherKind, ServerConfig};
use perfprobe_lib::db::{DbPool, ResultStore};
use perfprobe_lib::middleware::RequestLogger;
use perfprobe_lib::services::{build_launcher, JobCoordinator};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        let healthy = ServerConfig::from_env().is_ok();
        std::process::exit(if healthy { 0 } else { 1 });
    }

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    if let Err(e) = perfprobe_lib::init_tracing() {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match ServerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL and PERFPROBE_API_KEYS must be set");
            error!("  - The ecs launcher needs ECS_CLUSTER_/ECS_TASK_DEFINITION_/ECS_SUBNET_<REGION>");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Perfprobe");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = match DbPool::new(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!("Database connection established");

    if let Err(e) = pool.run_migrations().await {
        error!("{}", e);
        std::process::exit(1);
    }

    let store: Arc<dyn ResultStore> = Arc::new(pool);

    let launcher = build_launcher(&config.launcher).await;
    match config.launcher.kind {
        LauncherKind::Ecs => info!(
            "Launching workers on ECS in {} region(s)",
            config.launcher.targets.len()
        ),
        LauncherKind::Process => info!(
            "Launching workers as local processes ({})",
            config.launcher.worker_bin.display()
        ),
    }

    let api_keys = ApiKeys::new(config.api_keys.clone());
    if api_keys.is_open() {
        warn!("No API keys configured - submissions are accepted anonymously");
    }

    let coordinator = web::Data::new(JobCoordinator::new(store.clone(), launcher));
    let store = web::Data::from(store);
    let api_keys = web::Data::new(api_keys);

    let bind_address = config.bind_address();
    let is_development = config.is_development();
    let worker_count = if is_development { 4 } else { num_cpus::get() };
    info!(
        "Starting server at http://{} ({} workers)",
        bind_address, worker_count
    );

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                header::ACCEPT,
                header::CONTENT_TYPE,
                header::HeaderName::from_static("x-api-key"),
            ])
            .max_age(3600);
        // Production stays same-origin only
        if is_development {
            cors = cors
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000");
        }

        App::new()
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(store.clone())
            .app_data(coordinator.clone())
            .app_data(api_keys.clone())
            .configure(api::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}
