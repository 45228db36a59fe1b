//! Region result entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "region_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub job_id: Uuid,
    pub region: String,
    /// RUNNING | COMPLETED | FAILED
    pub status: String,
    // Metrics and report URLs are only set once the row is COMPLETED
    pub fcp: Option<f64>,
    pub lcp: Option<f64>,
    pub cls: Option<f64>,
    pub tbt: Option<f64>,
    pub tti: Option<f64>,
    pub score: Option<f64>,
    pub report_url: Option<String>,
    pub metrics_url: Option<String>,
    pub created_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::perf_job::Entity",
        from = "Column::JobId",
        to = "super::perf_job::Column::Id",
        on_delete = "Cascade"
    )]
    Job,
}

impl Related<super::perf_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
