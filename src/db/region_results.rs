//! Database queries for per-region audit results.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::entity::region_result::{self as result, ActiveModel, Entity as RegionResultEntity};
use crate::error::{AppError, AppResult};
use crate::models::{AuditMetrics, JobStatus, Region, RegionCompletion, RegionResult};

use super::DbPool;

impl TryFrom<result::Model> for RegionResult {
    type Error = AppError;

    fn try_from(m: result::Model) -> AppResult<Self> {
        let region = Region::parse(&m.region).ok_or_else(|| {
            AppError::Database(format!("Region result {} has unknown region '{}'", m.id, m.region))
        })?;
        let status = JobStatus::parse(&m.status).ok_or_else(|| {
            AppError::Database(format!("Region result {} has unknown status '{}'", m.id, m.status))
        })?;

        let metrics = match (m.fcp, m.lcp, m.cls, m.tbt, m.tti) {
            (Some(fcp), Some(lcp), Some(cls), Some(tbt), Some(tti)) => Some(AuditMetrics {
                fcp,
                lcp,
                cls,
                tbt,
                tti,
                score: m.score,
            }),
            _ => None,
        };

        Ok(RegionResult {
            id: m.id,
            job_id: m.job_id,
            region,
            status,
            metrics,
            report_url: m.report_url,
            metrics_url: m.metrics_url,
            created_at: m.created_at,
            completed_at: m.completed_at,
        })
    }
}

impl DbPool {
    /// Insert the RUNNING result row for a (job, region) pair.
    pub async fn insert_region_result(&self, job_id: Uuid, region: Region) -> AppResult<RegionResult> {
        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            job_id: Set(job_id),
            region: Set(region.as_str().to_string()),
            status: Set(JobStatus::Running.as_str().to_string()),
            fcp: Set(None),
            lcp: Set(None),
            cls: Set(None),
            tbt: Set(None),
            tti: Set(None),
            score: Set(None),
            report_url: Set(None),
            metrics_url: Set(None),
            created_at: Set(Utc::now()),
            completed_at: Set(None),
        };

        let inserted = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert region result: {}", e)))?;

        RegionResult::try_from(inserted)
    }

    /// Get a region result by ID.
    pub async fn get_region_result_by_id(&self, id: Uuid) -> AppResult<Option<RegionResult>> {
        let found = RegionResultEntity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get region result: {}", e)))?;

        found.map(RegionResult::try_from).transpose()
    }

    /// Get all region results for a job.
    pub async fn get_region_results_by_job_id(&self, job_id: Uuid) -> AppResult<Vec<RegionResult>> {
        RegionResultEntity::find()
            .filter(result::Column::JobId.eq(job_id))
            .order_by_asc(result::Column::Id) // UUIDv7 is time-ordered
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get region results: {}", e)))?
            .into_iter()
            .map(RegionResult::try_from)
            .collect()
    }

    /// Move a RUNNING result to COMPLETED.
    pub async fn complete_region_result(
        &self,
        id: Uuid,
        completion: RegionCompletion,
    ) -> AppResult<RegionResult> {
        let metrics = completion.metrics;
        let changes = ActiveModel {
            status: Set(JobStatus::Completed.as_str().to_string()),
            fcp: Set(Some(metrics.fcp)),
            lcp: Set(Some(metrics.lcp)),
            cls: Set(Some(metrics.cls)),
            tbt: Set(Some(metrics.tbt)),
            tti: Set(Some(metrics.tti)),
            score: Set(metrics.score),
            report_url: Set(Some(completion.report_url)),
            metrics_url: Set(Some(completion.metrics_url)),
            completed_at: Set(Some(completion.completed_at)),
            ..Default::default()
        };

        self.finish_running(id, changes).await
    }

    /// Move a RUNNING result to FAILED.
    pub async fn fail_region_result(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> AppResult<RegionResult> {
        let changes = ActiveModel {
            status: Set(JobStatus::Failed.as_str().to_string()),
            completed_at: Set(Some(completed_at)),
            ..Default::default()
        };

        self.finish_running(id, changes).await
    }

    /// Apply a terminal update, guarded on the row still being RUNNING.
    ///
    /// The updated row comes back from the same statement (`RETURNING`), so a
    /// transition that was applied is always reported as applied. Only a
    /// refused update is followed by a read, to say why it was refused.
    async fn finish_running(&self, id: Uuid, changes: ActiveModel) -> AppResult<RegionResult> {
        let mut updated = RegionResultEntity::update_many()
            .set(changes)
            .filter(result::Column::Id.eq(id))
            .filter(result::Column::Status.eq(JobStatus::Running.as_str()))
            .exec_with_returning(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update region result: {}", e)))?;

        match updated.pop() {
            Some(row) => RegionResult::try_from(row),
            None => Err(self.refused_update(id).await),
        }
    }

    async fn refused_update(&self, id: Uuid) -> AppError {
        match self.get_region_result_by_id(id).await {
            Ok(Some(current)) => {
                AppError::Database(format!("Region result {} is already {}", id, current.status))
            }
            Ok(None) => AppError::NotFound(format!("Region result {}", id)),
            Err(e) => e,
        }
    }
}
