//! Migration: Create region_results table.
//!
//! Each row is owned by exactly one worker: created RUNNING when the worker
//! starts, updated once to a terminal status when it finishes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE region_results (
                    id UUID PRIMARY KEY,
                    job_id UUID NOT NULL REFERENCES perf_jobs(id) ON DELETE CASCADE,
                    region VARCHAR(32) NOT NULL,

                    status VARCHAR(20) NOT NULL DEFAULT 'RUNNING'
                        CHECK (status IN ('RUNNING', 'COMPLETED', 'FAILED')),

                    -- Lighthouse metrics (COMPLETED only)
                    fcp DOUBLE PRECISION,
                    lcp DOUBLE PRECISION,
                    cls DOUBLE PRECISION,
                    tbt DOUBLE PRECISION,
                    tti DOUBLE PRECISION,
                    score DOUBLE PRECISION,

                    -- Uploaded report artifacts (COMPLETED only)
                    report_url VARCHAR(2048),
                    metrics_url VARCHAR(2048),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    completed_at TIMESTAMPTZ
                );

                -- Exactly one result per (job, region)
                CREATE UNIQUE INDEX idx_region_results_job_region ON region_results(job_id, region);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS region_results CASCADE;")
            .await?;

        Ok(())
    }
}
