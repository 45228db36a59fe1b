//! E2E tests: submission, validation and the happy path.

use perfprobe_lib::models::Region;
use perfprobe_lib::services::WorkerOutcome;
use serde_json::json;

use super::test_helpers::*;

/// Scenario A: one region, audit succeeds, job completes.
#[actix_rt::test]
async fn test_single_region_job_completes() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let app = create_test_app(&ctx, vec![]).await;

    let (status, body) = submit_job(
        &app,
        json!({"url": "example.com", "device": "desktop", "region": ["us-east-1"]}),
        None,
    )
    .await;
    assert_eq!(status, 200, "Submit should succeed: {:?}", body);
    let id = job_id(&body);

    // Workers are held: the job is RUNNING with no results yet
    let (status, job) = get_job(&app, &id).await;
    assert_eq!(status, 200);
    assert_eq!(job["status"], "RUNNING");
    assert_eq!(job["url"], "https://example.com");
    assert_eq!(job["device"], "desktop");
    assert_eq!(job["regions"], json!(["us-east-1"]));
    assert_eq!(job["requester"], "anonymous");
    assert!(job["completed_at"].is_null());
    assert_eq!(job["results"], json!([]));

    let outcomes = ctx.launcher.finish_all().await;
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], WorkerOutcome::Completed { .. }));

    let (_, job) = get_job(&app, &id).await;
    assert_eq!(job["status"], "COMPLETED");
    assert!(job["completed_at"].is_string());

    let results = job["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result["region"], "us-east-1");
    assert_eq!(result["status"], "COMPLETED");
    for metric in ["fcp", "lcp", "cls", "tbt", "tti"] {
        assert!(result["metrics"][metric].is_number(), "missing {}", metric);
    }
    assert_eq!(result["metrics"]["lcp"], 1630.0);
    assert_eq!(result["metrics"]["score"], 0.94);

    let report_url = result["report_url"].as_str().unwrap();
    let metrics_url = result["metrics_url"].as_str().unwrap();
    assert!(report_url.contains(&format!("lighthouse/{}/us-east-1/https___example_com_", id)));
    assert!(report_url.ends_with(".html"));
    assert!(metrics_url.ends_with(".json"));

    let keys = ctx.artifacts.keys();
    assert_eq!(keys.len(), 2);
    let (content_type, _) = ctx.artifacts.get(&keys[0]).unwrap();
    assert_eq!(content_type, "text/html");
    let (content_type, _) = ctx.artifacts.get(&keys[1]).unwrap();
    assert_eq!(content_type, "application/json");
}

/// Regions may arrive as a comma-separated string.
#[actix_rt::test]
async fn test_csv_regions_launch_in_order() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let app = create_test_app(&ctx, vec![]).await;

    let (status, body) = submit_job(
        &app,
        json!({"url": "https://example.com/shop", "device": "mobile", "region": "eu-west-1, us-west-2"}),
        None,
    )
    .await;
    assert_eq!(status, 200, "{:?}", body);
    assert_eq!(ctx.launcher.attempts(), vec![Region::EuWest1, Region::UsWest2]);

    let outcomes = ctx.launcher.finish_all().await;
    assert_eq!(outcomes.len(), 2);

    let (_, job) = get_job(&app, &job_id(&body)).await;
    assert_eq!(job["status"], "COMPLETED");
    let regions: Vec<&str> = job["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["region"].as_str().unwrap())
        .collect();
    assert_eq!(regions, vec!["eu-west-1", "us-west-2"]);

    // Each region points at its own pair of reports
    let results = job["results"].as_array().unwrap();
    assert_ne!(results[0]["report_url"], results[1]["report_url"]);
    assert_ne!(results[0]["metrics_url"], results[1]["metrics_url"]);
    assert_eq!(ctx.artifacts.keys().len(), 4);
}

/// Identical submissions produce independent jobs.
#[actix_rt::test]
async fn test_duplicate_submissions_are_independent() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let app = create_test_app(&ctx, vec![]).await;
    let body = json!({"url": "example.com", "device": "desktop", "region": ["us-east-1"]});

    let (_, first) = submit_job(&app, body.clone(), None).await;
    let (_, second) = submit_job(&app, body, None).await;

    assert_ne!(job_id(&first), job_id(&second));
    assert_eq!(ctx.store.job_count(), 2);
}

/// Scenario B: unknown region is rejected before any job exists.
#[actix_rt::test]
async fn test_invalid_region_rejected() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let app = create_test_app(&ctx, vec![]).await;

    let (status, body) = submit_job(
        &app,
        json!({"url": "example.com", "device": "desktop", "region": ["mars-1"]}),
        None,
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
    assert!(body["message"].as_str().unwrap().contains("mars-1"));
    assert_eq!(ctx.store.job_count(), 0);
    assert!(ctx.launcher.attempts().is_empty());
}

#[actix_rt::test]
async fn test_missing_fields_rejected() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let app = create_test_app(&ctx, vec![]).await;

    let cases = [
        json!({"device": "desktop", "region": ["us-east-1"]}),
        json!({"url": "example.com", "region": ["us-east-1"]}),
        json!({"url": "example.com", "device": "tablet", "region": ["us-east-1"]}),
        json!({"url": "example.com", "device": "desktop"}),
        json!({"url": "example.com", "device": "desktop", "region": []}),
        json!({"url": "ftp://example.com", "device": "desktop", "region": ["us-east-1"]}),
    ];
    for case in cases {
        let (status, body) = submit_job(&app, case.clone(), None).await;
        assert_eq!(status, 400, "{} should be rejected: {:?}", case, body);
        assert_eq!(body["error"], "INVALID_INPUT");
    }
    assert_eq!(ctx.store.job_count(), 0);
}

#[actix_rt::test]
async fn test_malformed_body_rejected() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let app = create_test_app(&ctx, vec![]).await;

    let req = actix_web::test::TestRequest::post()
        .uri("/api/v1/jobs")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[actix_rt::test]
async fn test_unknown_job_is_404() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let app = create_test_app(&ctx, vec![]).await;

    let (status, body) = get_job(&app, &uuid::Uuid::now_v7().to_string()).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, _) = get_job(&app, "not-a-uuid").await;
    assert_eq!(status, 400);
}
