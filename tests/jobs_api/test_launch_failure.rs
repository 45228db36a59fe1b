//! E2E tests: a worker cannot be launched.

use perfprobe_lib::models::{JobStatus, Region};
use perfprobe_lib::services::WorkerOutcome;
use serde_json::json;

use super::test_helpers::*;

/// Scenario C: the second region fails to launch after the first started.
#[actix_rt::test]
async fn test_launch_failure_fails_job_and_stops_launching() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, Some(Region::EuCentral1));
    let app = create_test_app(&ctx, vec![]).await;

    let (status, body) = submit_job(
        &app,
        json!({
            "url": "example.com",
            "device": "desktop",
            "region": ["us-east-1", "eu-central-1", "ap-southeast-1"]
        }),
        None,
    )
    .await;

    assert_eq!(status, 502, "{:?}", body);
    assert_eq!(body["error"], "LAUNCH_FAILED");
    assert!(body["message"].as_str().unwrap().contains("eu-central-1"));

    // Nothing after the failing region was attempted
    assert_eq!(ctx.launcher.attempts(), vec![Region::UsEast1, Region::EuCentral1]);

    let jobs = ctx.store.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert!(jobs[0].completed_at.is_some());

    // The already-launched region still runs to its own terminal state
    let outcomes = ctx.launcher.finish_all().await;
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], WorkerOutcome::Completed { .. }));

    let (status, job) = get_job(&app, &jobs[0].id.to_string()).await;
    assert_eq!(status, 200);
    assert_eq!(job["status"], "FAILED");
    let results = job["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["region"], "us-east-1");
    assert_eq!(results[0]["status"], "COMPLETED");
}
