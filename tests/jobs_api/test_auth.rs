//! E2E tests: API key handling on submission.

use perfprobe_lib::config::ApiKeyEntry;
use serde_json::json;

use super::test_helpers::*;

fn keys() -> Vec<ApiKeyEntry> {
    vec![ApiKeyEntry {
        name: "ci".to_string(),
        key: "ci-secret-key".to_string(),
    }]
}

fn body() -> serde_json::Value {
    json!({"url": "example.com", "device": "mobile", "region": ["us-east-1"]})
}

#[actix_rt::test]
async fn test_missing_key_is_401() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let app = create_test_app(&ctx, keys()).await;

    let (status, body) = submit_job(&app, body(), None).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "UNAUTHORIZED");
    assert_eq!(ctx.store.job_count(), 0);
}

#[actix_rt::test]
async fn test_wrong_key_is_401() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let app = create_test_app(&ctx, keys()).await;

    let (status, body) = submit_job(&app, body(), Some("not-the-key")).await;
    assert_eq!(status, 401);
    assert_eq!(body["message"], "Invalid API key");
}

/// The key's name becomes the job's requester.
#[actix_rt::test]
async fn test_valid_key_records_requester() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let app = create_test_app(&ctx, keys()).await;

    let (status, body) = submit_job(&app, body(), Some("ci-secret-key")).await;
    assert_eq!(status, 200, "{:?}", body);

    // Status reads need no key
    let (status, job) = get_job(&app, &job_id(&body)).await;
    assert_eq!(status, 200);
    assert_eq!(job["requester"], "ci");
}
