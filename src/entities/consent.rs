use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "consents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub consent_id: String,
    pub customer_id: String,
    pub status: String,
    pub redirect_url: String,
    pub fetch_type: String,
    pub consent_mode: String,
    pub purpose_code: String,
    pub purpose_text: String,
    pub range_from: i64,
    pub range_to: i64,
    pub data_life_unit: String,
    pub data_life_value: i64,
    pub frequency_unit: String,
    pub frequency_value: i64,
    #[sea_orm(column_type = "Text")]
    pub fi_types: String, // JSON array
    pub usage_count: i64,
    pub last_used_at: Option<i64>,
    pub expires_at: i64,
    #[sea_orm(column_type = "Text")]
    pub context: String, // JSON array of {key, value}
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
