//! CLI status poller.
//!
//! Usage:
//!   perfprobe-poll <job-id> [--base-url URL]
//!
//! The API key, when the server requires one, is read from `PERFPROBE_API_KEY`.
//! Prints the final job status as JSON. Exit codes: 0 completed, 1 failed,
//! 2 timed out, 3 read error, 130 interrupted.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use perfprobe_lib::client::{HttpStatusSource, PollOutcome, PollerConfig, StatusPoller};
use perfprobe_lib::models::JobStatusResponse;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    if let Err(e) = perfprobe_lib::init_tracing() {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || matches!(args[1].as_str(), "help" | "--help" | "-h") {
        print_usage();
        return ExitCode::from(if args.len() < 2 { 3 } else { 0 });
    }

    let job_id = match Uuid::parse_str(&args[1]) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error: '{}' is not a job id: {}", args[1], e);
            return ExitCode::from(3);
        }
    };

    let base_url = parse_flag(&args, "--base-url")
        .or_else(|| env::var("PERFPROBE_URL").ok())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let api_key = env::var("PERFPROBE_API_KEY").ok().map(SecretString::from);

    let source = match HttpStatusSource::new(&base_url, api_key) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(3);
        }
    };

    let poller = StatusPoller::new(Arc::new(source), PollerConfig::default());
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match poller.poll(job_id, cancel).await {
        Ok(PollOutcome::Completed(status)) => {
            print_status(&status);
            ExitCode::SUCCESS
        }
        Ok(PollOutcome::Failed(status)) => {
            print_status(&status);
            ExitCode::from(1)
        }
        Ok(PollOutcome::TimedOut { last_seen }) => {
            eprintln!("Timed out waiting for job {}", job_id);
            if let Some(status) = last_seen {
                print_status(&status);
            }
            ExitCode::from(2)
        }
        Ok(PollOutcome::Cancelled) => {
            eprintln!("Interrupted");
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(3)
        }
    }
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn print_status(status: &JobStatusResponse) {
    match serde_json::to_string_pretty(status) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error encoding status: {}", e),
    }
}

fn print_usage() {
    eprintln!("Usage: perfprobe-poll <job-id> [--base-url URL]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PERFPROBE_URL      API base URL (default: {})", DEFAULT_BASE_URL);
    eprintln!("  PERFPROBE_API_KEY  value sent as X-API-Key");
}
