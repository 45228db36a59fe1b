//! Perfprobe library.
//!
//! Multi-region Lighthouse performance audits: the job coordinator and status
//! API, the audit worker, and the caller-side status poller.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default INFO level.
pub fn init_tracing() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
}
