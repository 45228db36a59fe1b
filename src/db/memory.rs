//! In-process result store.
//!
//! Keeps the same row rules as the PostgreSQL store: one result per
//! (job, region) and terminal region results are immutable.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Job, JobStatus, NewJob, Region, RegionCompletion, RegionResult};

use super::ResultStore;

#[derive(Debug, Default)]
struct Tables {
    jobs: Vec<Job>,
    results: Vec<RegionResult>,
}

/// [`ResultStore`] backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs recorded so far.
    pub fn job_count(&self) -> usize {
        self.tables().map(|t| t.jobs.len()).unwrap_or(0)
    }

    /// Snapshot of every job, in creation order.
    pub fn jobs(&self) -> Vec<Job> {
        self.tables().map(|t| t.jobs.clone()).unwrap_or_default()
    }

    fn tables(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Database("Memory store lock poisoned".to_string()))
    }

    fn finish_running(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut RegionResult),
    ) -> AppResult<RegionResult> {
        let mut tables = self.tables()?;
        let row = tables
            .results
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Region result {}", id)))?;

        if row.status != JobStatus::Running {
            return Err(AppError::Database(format!(
                "Region result {} is already {}",
                id, row.status
            )));
        }

        apply(row);
        Ok(row.clone())
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn insert_job(&self, new_job: NewJob) -> AppResult<Job> {
        let job = Job {
            id: Uuid::now_v7(),
            url: new_job.url,
            device: new_job.device,
            regions: new_job.regions,
            requester: new_job.requester,
            client_ip: new_job.client_ip,
            status: JobStatus::Running,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.tables()?.jobs.push(job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: Uuid) -> AppResult<Option<Job>> {
        Ok(self.tables()?.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn mark_job_failed(&self, id: Uuid, completed_at: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.tables()?;
        let job = tables
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Job {}", id)))?;
        job.status = JobStatus::Failed;
        job.completed_at = Some(completed_at);
        Ok(())
    }

    async fn create_region_result(&self, job_id: Uuid, region: Region) -> AppResult<RegionResult> {
        let mut tables = self.tables()?;
        if !tables.jobs.iter().any(|j| j.id == job_id) {
            return Err(AppError::NotFound(format!("Job {}", job_id)));
        }
        if tables
            .results
            .iter()
            .any(|r| r.job_id == job_id && r.region == region)
        {
            return Err(AppError::Database(format!(
                "Region result for job {} in {} already exists",
                job_id, region
            )));
        }

        let row = RegionResult {
            id: Uuid::now_v7(),
            job_id,
            region,
            status: JobStatus::Running,
            metrics: None,
            report_url: None,
            metrics_url: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        tables.results.push(row.clone());
        Ok(row)
    }

    async fn complete_region_result(
        &self,
        id: Uuid,
        completion: RegionCompletion,
    ) -> AppResult<RegionResult> {
        self.finish_running(id, |row| {
            row.status = JobStatus::Completed;
            row.metrics = Some(completion.metrics);
            row.report_url = Some(completion.report_url);
            row.metrics_url = Some(completion.metrics_url);
            row.completed_at = Some(completion.completed_at);
        })
    }

    async fn fail_region_result(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> AppResult<RegionResult> {
        self.finish_running(id, |row| {
            row.status = JobStatus::Failed;
            row.completed_at = Some(completed_at);
        })
    }

    async fn list_region_results(&self, job_id: Uuid) -> AppResult<Vec<RegionResult>> {
        Ok(self
            .tables()?
            .results
            .iter()
            .filter(|r| r.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        self.tables().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditMetrics, Device};

    fn new_job() -> NewJob {
        NewJob {
            url: "https://example.com".to_string(),
            device: Device::Desktop,
            regions: vec![Region::UsEast1, Region::EuWest1],
            requester: "ci".to_string(),
            client_ip: Some("10.0.0.1".to_string()),
        }
    }

    fn completion() -> RegionCompletion {
        RegionCompletion {
            metrics: AuditMetrics {
                fcp: 800.0,
                lcp: 1200.0,
                cls: 0.01,
                tbt: 50.0,
                tti: 1500.0,
                score: Some(0.97),
            },
            report_url: "https://bucket.s3.amazonaws.com/a.html".to_string(),
            metrics_url: "https://bucket.s3.amazonaws.com/a.json".to_string(),
            completed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_job_starts_running() {
        let store = MemoryStore::new();
        let job = store.insert_job(new_job()).await.unwrap();

        assert_eq!(job.status, JobStatus::Running);
        assert!(job.completed_at.is_none());
        assert_eq!(store.get_job(job.id).await.unwrap(), Some(job));
        assert_eq!(store.job_count(), 1);
    }

    #[tokio::test]
    async fn test_region_result_unique_per_job_and_region() {
        let store = MemoryStore::new();
        let job = store.insert_job(new_job()).await.unwrap();

        store.create_region_result(job.id, Region::UsEast1).await.unwrap();
        let err = store
            .create_region_result(job.id, Region::UsEast1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        store.create_region_result(job.id, Region::EuWest1).await.unwrap();
        assert_eq!(store.list_region_results(job.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_region_result_requires_existing_job() {
        let store = MemoryStore::new();
        let err = store
            .create_region_result(Uuid::now_v7(), Region::UsEast1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_terminal_region_result_is_immutable() {
        let store = MemoryStore::new();
        let job = store.insert_job(new_job()).await.unwrap();
        let row = store.create_region_result(job.id, Region::UsEast1).await.unwrap();

        let done = store.complete_region_result(row.id, completion()).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.metrics.map(|m| m.lcp), Some(1200.0));

        let err = store.fail_region_result(row.id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        let rows = store.list_region_results(job.id).await.unwrap();
        assert_eq!(rows[0].status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_mark_job_failed_unknown_job() {
        let store = MemoryStore::new();
        let err = store.mark_job_failed(Uuid::now_v7(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
