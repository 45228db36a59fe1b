//! SeaORM entity definitions for PostgreSQL database.

pub mod perf_job;
pub mod region_result;
