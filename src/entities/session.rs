use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: String,
    pub consent_id: String,
    pub status: String, // "PENDING" | "COMPLETED" | "FAILED" | "PARTIAL"
    pub format: String,
    pub range_from: i64,
    pub range_to: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub payload: Option<String>, // JSON, set once on completion
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
