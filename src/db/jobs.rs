//! Database queries for audit jobs.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entity::perf_job::{self as job, ActiveModel, Entity as PerfJob};
use crate::error::{AppError, AppResult};
use crate::models::{Device, Job, JobStatus, NewJob, Region};

use super::DbPool;

impl TryFrom<job::Model> for Job {
    type Error = AppError;

    fn try_from(m: job::Model) -> AppResult<Self> {
        let device = Device::parse(&m.device).ok_or_else(|| {
            AppError::Database(format!("Job {} has unknown device '{}'", m.id, m.device))
        })?;
        let status = JobStatus::parse(&m.status).ok_or_else(|| {
            AppError::Database(format!("Job {} has unknown status '{}'", m.id, m.status))
        })?;
        let regions: Vec<Region> = serde_json::from_value(m.regions).map_err(|e| {
            AppError::Database(format!("Job {} has malformed regions: {}", m.id, e))
        })?;

        Ok(Job {
            id: m.id,
            url: m.url,
            device,
            regions,
            requester: m.requester,
            client_ip: m.client_ip,
            status,
            created_at: m.created_at,
            completed_at: m.completed_at,
        })
    }
}

impl DbPool {
    /// Insert a new job in RUNNING state.
    pub async fn insert_job(&self, new_job: NewJob) -> AppResult<Job> {
        let regions = serde_json::to_value(&new_job.regions)
            .map_err(|e| AppError::Database(format!("Failed to encode regions: {}", e)))?;

        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            url: Set(new_job.url),
            device: Set(new_job.device.as_str().to_string()),
            regions: Set(regions),
            requester: Set(new_job.requester),
            client_ip: Set(new_job.client_ip),
            status: Set(JobStatus::Running.as_str().to_string()),
            created_at: Set(Utc::now()),
            completed_at: Set(None),
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert job: {}", e)))?;

        Job::try_from(result)
    }

    /// Get a job by ID.
    pub async fn get_job_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        let result = PerfJob::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get job: {}", e)))?;

        result.map(Job::try_from).transpose()
    }

    /// Mark a job FAILED and stamp its completion time.
    pub async fn mark_job_failed(&self, id: Uuid, completed_at: DateTime<Utc>) -> AppResult<()> {
        let result = PerfJob::update_many()
            .set(ActiveModel {
                status: Set(JobStatus::Failed.as_str().to_string()),
                completed_at: Set(Some(completed_at)),
                ..Default::default()
            })
            .filter(job::Column::Id.eq(id))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to mark job failed: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Job {}", id)));
        }

        Ok(())
    }
}
