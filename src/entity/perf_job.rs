//! Audit job entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "perf_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub url: String,
    /// desktop | mobile
    pub device: String,
    /// Requested region tags in launch order (JSON array of strings)
    #[sea_orm(column_type = "JsonBinary")]
    pub regions: JsonValue,
    pub requester: String,
    pub client_ip: Option<String>,
    /// RUNNING | COMPLETED | FAILED
    pub status: String,
    pub created_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::region_result::Entity")]
    RegionResults,
}

impl Related<super::region_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RegionResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
