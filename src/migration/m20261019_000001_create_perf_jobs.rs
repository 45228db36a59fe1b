//! Migration: Create perf_jobs table.
//!
//! One row per submitted audit job. Only the coordinator writes to it.

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
                CREATE TABLE perf_jobs (
                    id UUID PRIMARY KEY, -- UUIDv7 for time-ordered sorting
                    url VARCHAR(2048) NOT NULL,
                    device VARCHAR(16) NOT NULL
                        CHECK (device IN ('desktop', 'mobile')),

                    -- Requested region tags, in launch order
                    regions JSONB NOT NULL,

                    requester VARCHAR(255) NOT NULL,
                    client_ip VARCHAR(64),

                    status VARCHAR(20) NOT NULL DEFAULT 'RUNNING'
                        CHECK (status IN ('RUNNING', 'COMPLETED', 'FAILED')),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    completed_at TIMESTAMPTZ
                );

                CREATE INDEX idx_perf_jobs_requester ON perf_jobs(requester, created_at DESC);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS perf_jobs CASCADE;")
            .await?;

        Ok(())
    }
}
