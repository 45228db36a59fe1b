//! Job API E2E test suite.
//!
//! Drives the actix app with an in-memory result store, an in-memory
//! artifact store, and a launcher that runs audit workers as local tasks
//! against a scripted audit runner. No database or network is needed.
//!
//! Run with: cargo test --test jobs_api

mod test_helpers;

mod test_auth;
mod test_launch_failure;
mod test_polling;
mod test_submit;
mod test_worker_failure;
