//! E2E tests: the status poller against a live job.

use std::sync::Arc;
use std::time::Duration;

use perfprobe_lib::auth::Requester;
use perfprobe_lib::client::{PollOutcome, PollerConfig, StatusPoller};
use perfprobe_lib::models::{Device, JobStatus, Region};
use perfprobe_lib::services::Submission;
use tokio_util::sync::CancellationToken;

use super::test_helpers::*;

fn submission() -> Submission {
    Submission {
        url: "https://example.com".to_string(),
        device: Device::Desktop,
        regions: vec![Region::UsEast1, Region::ApSoutheast1],
    }
}

fn requester() -> Requester {
    Requester {
        name: "poller-test".to_string(),
        client_ip: None,
    }
}

/// Polling follows a job from RUNNING to COMPLETED.
#[actix_rt::test]
async fn test_poll_until_completed() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let job_id = ctx.coordinator().submit(submission(), requester()).await.unwrap();

    let poller = StatusPoller::new(
        Arc::new(StoreStatusSource(ctx.store.clone())),
        PollerConfig {
            interval: Duration::from_millis(20),
            timeout: Duration::from_secs(10),
        },
    );
    let handle = poller.spawn(job_id);

    ctx.launcher.release();
    let outcome = handle.outcome().await.unwrap();

    match outcome {
        PollOutcome::Completed(status) => {
            assert_eq!(status.results.len(), 2);
            assert!(status.results.iter().all(|r| r.status == JobStatus::Completed));
        }
        other => panic!("expected completion, got {:?}", other),
    }
}

/// Scenario E: workers never finish; the poller gives up after five minutes.
#[tokio::test(start_paused = true)]
async fn test_poll_times_out_and_leaves_job_running() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let job_id = ctx.coordinator().submit(submission(), requester()).await.unwrap();
    // Workers stay held and never write a result

    let poller = StatusPoller::new(
        Arc::new(StoreStatusSource(ctx.store.clone())),
        PollerConfig::default(),
    );
    let start = tokio::time::Instant::now();
    let outcome = poller.poll(job_id, CancellationToken::new()).await.unwrap();

    match outcome {
        PollOutcome::TimedOut { last_seen } => {
            assert_eq!(last_seen.map(|s| s.status), Some(JobStatus::Running));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(start.elapsed() >= Duration::from_secs(300));
    assert!(start.elapsed() < Duration::from_secs(302));

    let jobs = ctx.store.jobs();
    assert_eq!(jobs[0].status, JobStatus::Running);
    assert!(jobs[0].completed_at.is_none());
}

/// An unknown job stops the poll with the read error.
#[actix_rt::test]
async fn test_poll_unknown_job_surfaces_error() {
    let ctx = TestContext::new(FakeAuditor::Succeeds, None);
    let poller = StatusPoller::new(
        Arc::new(StoreStatusSource(ctx.store.clone())),
        PollerConfig::default(),
    );

    let err = poller
        .poll(uuid::Uuid::now_v7(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"));
}
