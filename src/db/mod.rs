//! Result store: connection management, migrations, and job/region queries.
//!
//! [`ResultStore`] is the narrow contract the coordinator, the workers and the
//! status endpoint share. [`DbPool`] implements it on PostgreSQL;
//! [`MemoryStore`] implements it in process.

pub mod jobs;
pub mod memory;
pub mod region_results;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseSettings;
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;
use crate::models::{Job, NewJob, Region, RegionCompletion, RegionResult};

pub use memory::MemoryStore;

/// Durable record of jobs and their per-region results.
///
/// Row ownership is exclusive: job rows are written by the coordinator only,
/// each region result by the one worker that created it. Terminal updates on
/// a region result succeed only while the row is still RUNNING.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Create a job with status RUNNING.
    async fn insert_job(&self, new_job: NewJob) -> AppResult<Job>;

    async fn get_job(&self, id: Uuid) -> AppResult<Option<Job>>;

    /// Mark a job FAILED after a launch failure.
    async fn mark_job_failed(&self, id: Uuid, completed_at: DateTime<Utc>) -> AppResult<()>;

    /// Create the RUNNING result row for one (job, region) pair.
    async fn create_region_result(&self, job_id: Uuid, region: Region) -> AppResult<RegionResult>;

    /// Move a RUNNING result to COMPLETED with its metrics and report URLs.
    async fn complete_region_result(
        &self,
        id: Uuid,
        completion: RegionCompletion,
    ) -> AppResult<RegionResult>;

    /// Move a RUNNING result to FAILED.
    async fn fail_region_result(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> AppResult<RegionResult>;

    async fn list_region_results(&self, job_id: Uuid) -> AppResult<Vec<RegionResult>>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> AppResult<()>;
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Connect to PostgreSQL.
    pub async fn new(settings: &DatabaseSettings) -> AppResult<Self> {
        let mut options = ConnectOptions::new(settings.url.clone());
        options
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        Ok(DbPool { conn })
    }

    /// Get access to the connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply pending schema migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to run migrations: {}", e)))?;
        info!("Database migrations complete");
        Ok(())
    }
}

#[async_trait]
impl ResultStore for DbPool {
    async fn insert_job(&self, new_job: NewJob) -> AppResult<Job> {
        DbPool::insert_job(self, new_job).await
    }

    async fn get_job(&self, id: Uuid) -> AppResult<Option<Job>> {
        DbPool::get_job_by_id(self, id).await
    }

    async fn mark_job_failed(&self, id: Uuid, completed_at: DateTime<Utc>) -> AppResult<()> {
        DbPool::mark_job_failed(self, id, completed_at).await
    }

    async fn create_region_result(&self, job_id: Uuid, region: Region) -> AppResult<RegionResult> {
        DbPool::insert_region_result(self, job_id, region).await
    }

    async fn complete_region_result(
        &self,
        id: Uuid,
        completion: RegionCompletion,
    ) -> AppResult<RegionResult> {
        DbPool::complete_region_result(self, id, completion).await
    }

    async fn fail_region_result(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> AppResult<RegionResult> {
        DbPool::fail_region_result(self, id, completed_at).await
    }

    async fn list_region_results(&self, job_id: Uuid) -> AppResult<Vec<RegionResult>> {
        DbPool::get_region_results_by_job_id(self, job_id).await
    }

    async fn ping(&self) -> AppResult<()> {
        let stmt = sea_orm::Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT 1".to_owned(),
        );
        self.conn
            .query_one_raw(stmt)
            .await
            .map_err(|e| AppError::Database(format!("Database ping failed: {}", e)))?;
        Ok(())
    }
}
