//! E2E tests: the audit itself fails inside a worker.

use perfprobe_lib::services::WorkerOutcome;
use serde_json::json;

use super::test_helpers::*;

/// Scenario D: measurement throws, region result becomes FAILED.
#[actix_rt::test]
async fn test_audit_failure_marks_region_failed() {
    let ctx = TestContext::new(FakeAuditor::Fails("Chrome could not load the page"), None);
    let app = create_test_app(&ctx, vec![]).await;

    let (status, body) = submit_job(
        &app,
        json!({"url": "example.com", "device": "mobile", "region": ["us-east-1", "eu-west-1"]}),
        None,
    )
    .await;
    // Audit failures are not submission failures
    assert_eq!(status, 200, "{:?}", body);

    let outcomes = ctx.launcher.finish_all().await;
    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        match outcome {
            WorkerOutcome::Failed { reason } => {
                assert!(reason.contains("Chrome could not load the page"))
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    let (_, job) = get_job(&app, &job_id(&body)).await;
    assert_eq!(job["status"], "FAILED");
    assert!(job["completed_at"].is_string());
    for result in job["results"].as_array().unwrap() {
        assert_eq!(result["status"], "FAILED");
        assert!(result["completed_at"].is_string());
        assert!(result["metrics"].is_null());
        assert!(result["report_url"].is_null());
        assert!(result["metrics_url"].is_null());
    }

    assert!(ctx.artifacts.keys().is_empty());
}

/// Terminal results do not change on later reads.
#[actix_rt::test]
async fn test_terminal_results_are_stable() {
    let ctx = TestContext::new(FakeAuditor::Fails("timeout"), None);
    let app = create_test_app(&ctx, vec![]).await;

    let (_, body) = submit_job(
        &app,
        json!({"url": "example.com", "device": "desktop", "region": ["us-east-1"]}),
        None,
    )
    .await;
    ctx.launcher.finish_all().await;

    let id = job_id(&body);
    let (_, first) = get_job(&app, &id).await;
    let (_, second) = get_job(&app, &id).await;
    assert_eq!(first["results"], second["results"]);
    assert_eq!(first["completed_at"], second["completed_at"]);
}
