//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20261019_000001_create_perf_jobs;
mod m20261019_000002_create_region_results;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261019_000001_create_perf_jobs::Migration),
            Box::new(m20261019_000002_create_region_results::Migration),
        ]
    }
}
