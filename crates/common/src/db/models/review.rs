//! Raw review entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inclusive rating bounds enforced at persistence time
pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    pub rating: f64,

    /// When the review was originally written
    pub date: DateTimeUtc,

    /// When the review was harvested
    pub collection_time: DateTimeUtc,

    /// Uploading user
    pub user_id: i32,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(has_one = "super::processed_review::Entity")]
    ProcessedReview,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::processed_review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProcessedReview.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
