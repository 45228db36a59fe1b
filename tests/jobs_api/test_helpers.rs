//! Shared helpers for job API tests.

use std::sync::{Arc, Mutex};

use actix_web::{App, dev::ServiceResponse, test, web};
use async_trait::async_trait;
use perfprobe_lib::api;
use perfprobe_lib::auth::ApiKeys;
use perfprobe_lib::client::{JobStatusSource, PollError};
use perfprobe_lib::config::ApiKeyEntry;
use perfprobe_lib::db::{MemoryStore, ResultStore};
use perfprobe_lib::error::{AppError, AppResult};
use perfprobe_lib::middleware::RequestLogger;
use perfprobe_lib::models::{Device, JobStatusResponse, Region};
use perfprobe_lib::services::launcher::LaunchError;
use perfprobe_lib::services::{
    read_job_status, AuditArtifacts, AuditRunner, AuditWorker, JobCoordinator, LaunchReceipt,
    MemoryArtifactStore, WorkerLauncher, WorkerOutcome, WorkerParams,
};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Lighthouse-shaped report with all five metrics.
pub const REPORT_JSON: &str = r#"{
    "audits": {
        "first-contentful-paint": {"numericValue": 812.4},
        "largest-contentful-paint": {"numericValue": 1630.0},
        "total-blocking-time": {"numericValue": 95.0},
        "cumulative-layout-shift": {"numericValue": 0.02},
        "interactive": {"numericValue": 2210.7}
    },
    "categories": {"performance": {"score": 0.94}}
}"#;

/// Audit runner answering from a script instead of a browser.
pub enum FakeAuditor {
    Succeeds,
    Fails(&'static str),
}

#[async_trait]
impl AuditRunner for FakeAuditor {
    async fn run(&self, url: &str, _device: Device) -> AppResult<AuditArtifacts> {
        match self {
            Self::Succeeds => Ok(AuditArtifacts {
                html: format!("<html><body>Report for {}</body></html>", url),
                json: REPORT_JSON.to_string(),
            }),
            Self::Fails(reason) => Err(AppError::Audit(reason.to_string())),
        }
    }
}

/// Launcher running each worker as a local task.
///
/// Workers wait until [`InProcessLauncher::release`] so tests can observe the
/// job before any region result exists.
pub struct InProcessLauncher {
    worker: AuditWorker,
    fail_for: Option<Region>,
    gate: watch::Sender<bool>,
    attempts: Mutex<Vec<Region>>,
    tasks: Mutex<Vec<JoinHandle<WorkerOutcome>>>,
}

impl InProcessLauncher {
    /// Let every launched (and future) worker start.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Regions a launch was attempted for, in order.
    pub fn attempts(&self) -> Vec<Region> {
        self.attempts.lock().unwrap().clone()
    }

    /// Release workers and wait for all launched ones to finish.
    pub async fn finish_all(&self) -> Vec<WorkerOutcome> {
        self.release();
        let tasks: Vec<_> = self.tasks.lock().unwrap().drain(..).collect();
        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.expect("worker task panicked"));
        }
        outcomes
    }
}

#[async_trait]
impl WorkerLauncher for InProcessLauncher {
    async fn launch(&self, params: &WorkerParams) -> Result<LaunchReceipt, LaunchError> {
        self.attempts.lock().unwrap().push(params.region);
        if self.fail_for == Some(params.region) {
            return Err(LaunchError::Rejected(format!(
                "no capacity in {}",
                params.region
            )));
        }

        let worker = self.worker.clone();
        let task_params = params.clone();
        let mut gate = self.gate.subscribe();
        let task = tokio::spawn(async move {
            let _ = gate.wait_for(|open| *open).await;
            worker.run(&task_params).await
        });
        self.tasks.lock().unwrap().push(task);

        Ok(LaunchReceipt {
            region: params.region,
            handle: format!("local/{}/{}", params.job_id, params.region),
        })
    }
}

/// Status source reading the store directly, as the GET endpoint does.
pub struct StoreStatusSource(pub Arc<MemoryStore>);

#[async_trait]
impl JobStatusSource for StoreStatusSource {
    async fn fetch(&self, job_id: Uuid) -> Result<JobStatusResponse, PollError> {
        match read_job_status(self.0.as_ref(), job_id).await {
            Ok(Some(status)) => Ok(status),
            Ok(None) => Err(PollError::Status {
                status: 404,
                message: format!("Job {} not found", job_id),
            }),
            Err(e) => Err(PollError::Transport(e.to_string())),
        }
    }
}

/// Everything a test app is wired from.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub artifacts: Arc<MemoryArtifactStore>,
    pub launcher: Arc<InProcessLauncher>,
}

impl TestContext {
    pub fn new(auditor: FakeAuditor, fail_for: Option<Region>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let worker = AuditWorker::new(
            store.clone(),
            artifacts.clone(),
            Arc::new(auditor),
            "lighthouse",
        );
        let (gate, _) = watch::channel(false);
        let launcher = Arc::new(InProcessLauncher {
            worker,
            fail_for,
            gate,
            attempts: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
        });

        Self {
            store,
            artifacts,
            launcher,
        }
    }

    pub fn coordinator(&self) -> JobCoordinator {
        JobCoordinator::new(self.store.clone(), self.launcher.clone())
    }
}

/// Create a test app with the given API keys (none means anonymous access).
pub async fn create_test_app(
    ctx: &TestContext,
    keys: Vec<ApiKeyEntry>,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    let store: Arc<dyn ResultStore> = ctx.store.clone();

    test::init_service(
        App::new()
            .wrap(RequestLogger)
            .app_data(web::Data::from(store))
            .app_data(web::Data::new(ctx.coordinator()))
            .app_data(web::Data::new(ApiKeys::new(keys)))
            .configure(api::configure),
    )
    .await
}

/// POST /api/v1/jobs.
pub async fn submit_job<S>(app: &S, body: Value, api_key: Option<&str>) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let mut req = test::TestRequest::post()
        .uri("/api/v1/jobs")
        .set_json(body);
    if let Some(key) = api_key {
        req = req.insert_header(("X-API-Key", key));
    }
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// GET /api/v1/jobs/{id}.
pub async fn get_job<S>(app: &S, id: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/jobs/{}", id))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// Pull the job id out of a successful submission.
pub fn job_id(body: &Value) -> String {
    body["id"]
        .as_str()
        .unwrap_or_else(|| panic!("no id in {:?}", body))
        .to_string()
}
