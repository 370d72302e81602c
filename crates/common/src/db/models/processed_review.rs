//! Processed review entity: the analysis-augmented copy of a review

use crate::vocabulary::{split_tags, CompetitorMention, Dimension, Priority, Sentiment};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "processed_reviews")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// One processed row per review
    #[sea_orm(unique)]
    pub review_id: i32,

    // Display fields copied from the review
    #[sea_orm(column_type = "Text")]
    pub text: String,

    pub rating: f64,

    pub date: DateTimeUtc,

    pub collection_time: DateTimeUtc,

    pub user_id: i32,

    // Analysis fields, null until analyzed
    #[sea_orm(column_type = "Text", nullable)]
    pub theme: Option<String>,

    pub sentiment: Option<Sentiment>,

    #[sea_orm(column_type = "Text", nullable)]
    pub category: Option<String>,

    pub priority: Option<Priority>,

    pub competitor_mention: Option<CompetitorMention>,

    /// Comma-delimited, order preserved
    #[sea_orm(column_type = "Text", nullable)]
    pub tags: Option<String>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Tags as an ordered list
    pub fn tag_list(&self) -> Option<Vec<String>> {
        self.tags.as_deref().map(split_tags)
    }

    /// Whether a dimension already holds a value
    pub fn has_dimension(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Theme => self.theme.is_some(),
            Dimension::Category => self.category.is_some(),
            Dimension::Tags => self.tags.is_some(),
            Dimension::Sentiment => self.sentiment.is_some(),
            Dimension::Priority => self.priority.is_some(),
            Dimension::CompetitorMention => self.competitor_mention.is_some(),
        }
    }

    /// True when every analysis field is null
    pub fn is_unanalyzed(&self) -> bool {
        self.theme.is_none()
            && self.sentiment.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.competitor_mention.is_none()
            && self.tags.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::review::Entity",
        from = "Column::ReviewId",
        to = "super::review::Column::Id",
        on_delete = "Cascade"
    )]
    Review,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
