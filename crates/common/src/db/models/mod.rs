//! SeaORM entity models
//!
//! Database entities for SentAI

mod ai_recommendation;
mod competitor_recommendation;
mod processed_review;
mod review;
mod user;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use review::{
    Entity as ReviewEntity,
    Model as Review,
    ActiveModel as ReviewActiveModel,
    Column as ReviewColumn,
    MAX_RATING,
    MIN_RATING,
};

pub use processed_review::{
    Entity as ProcessedReviewEntity,
    Model as ProcessedReview,
    ActiveModel as ProcessedReviewActiveModel,
    Column as ProcessedReviewColumn,
};

pub use ai_recommendation::{
    Entity as AiRecommendationEntity,
    Model as AiRecommendation,
    ActiveModel as AiRecommendationActiveModel,
    Column as AiRecommendationColumn,
};

pub use competitor_recommendation::{
    Entity as CompetitorRecommendationEntity,
    Model as CompetitorRecommendation,
    ActiveModel as CompetitorRecommendationActiveModel,
    Column as CompetitorRecommendationColumn,
};
