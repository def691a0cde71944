use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "institutions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub fip_id: String,
    pub name: String,
    pub institution_type: String,
    pub status: String,  // "ACTIVE" | "INACTIVE"
    #[sea_orm(column_type = "Text")]
    pub fi_types: String, // JSON array: ["DEPOSIT", "TERM_DEPOSIT"]
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
