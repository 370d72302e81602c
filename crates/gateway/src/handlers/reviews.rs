//! Review listing, ingestion and analysis-field editing handlers

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AppState;
use sentai_common::{
    auth::{AuthUser, Capability},
    db::{
        models::{ProcessedReview, Review, User},
        AnalysisPatch, BulkEditItem, ProcessedFilter,
    },
    errors::Result,
    extract::{Json, Query},
    pipeline::{ingest_rows, IngestReport},
    vocabulary::{CompetitorMention, Priority, Sentiment},
};

/// Uploader shown next to a review
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerView {
    pub full_name: String,
    pub organization: String,
}

impl From<User> for OwnerView {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name,
            organization: user.organization,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: i32,
    pub text: String,
    pub rating: f64,
    pub date: DateTime<Utc>,
    pub collection_time: DateTime<Utc>,
    pub user_id: i32,
    pub user: Option<OwnerView>,
}

impl ReviewView {
    fn new(review: Review, owner: Option<User>) -> Self {
        Self {
            id: review.id,
            text: review.text,
            rating: review.rating,
            date: review.date,
            collection_time: review.collection_time,
            user_id: review.user_id,
            user: owner.map(Into::into),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedReviewView {
    pub id: i32,
    pub review_id: i32,
    pub text: String,
    pub rating: f64,
    pub date: DateTime<Utc>,
    pub collection_time: DateTime<Utc>,
    pub theme: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub competitor_mention: Option<CompetitorMention>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<OwnerView>,
}

impl ProcessedReviewView {
    pub fn new(review: ProcessedReview, owner: Option<User>) -> Self {
        let tags = review.tag_list().unwrap_or_default();
        Self {
            id: review.id,
            review_id: review.review_id,
            text: review.text,
            rating: review.rating,
            date: review.date,
            collection_time: review.collection_time,
            theme: review.theme,
            sentiment: review.sentiment,
            category: review.category,
            priority: review.priority,
            competitor_mention: review.competitor_mention,
            tags,
            user: owner.map(Into::into),
        }
    }
}

impl From<ProcessedReview> for ProcessedReviewView {
    fn from(review: ProcessedReview) -> Self {
        Self::new(review, None)
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewList {
    pub reviews: Vec<ReviewView>,
}

#[derive(Debug, Serialize)]
pub struct ProcessedList {
    pub reviews: Vec<ProcessedReviewView>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUploadRequest {
    pub reviews: Vec<Value>,
}

/// Write acknowledgement carrying the updated row
#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub review: ProcessedReviewView,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFieldsRequest {
    pub id: i32,
    #[serde(flatten)]
    pub patch: AnalysisPatch,
}

#[derive(Debug, Deserialize)]
pub struct UpdateThemeRequest {
    pub id: i32,
    pub theme: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub id: i32,
}

#[derive(Debug, Deserialize)]
pub struct BulkEditRequest {
    pub reviews: Vec<BulkEditItem>,
}

/// All raw reviews, ordered by id
pub async fn list_reviews(State(state): State<AppState>, auth: AuthUser) -> Result<Json<ReviewList>> {
    auth.require(Capability::ReadReviews)?;

    let reviews = state
        .repo
        .list_reviews()
        .await?
        .into_iter()
        .map(|(review, owner)| ReviewView::new(review, owner))
        .collect();

    Ok(Json(ReviewList { reviews }))
}

/// Ingest spreadsheet rows owned by the caller
pub async fn bulk_upload(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<BulkUploadRequest>,
) -> Result<Json<IngestReport>> {
    auth.require(Capability::IngestReviews)?;

    let report = ingest_rows(
        &state.repo,
        auth.id,
        &request.reviews,
        state.config.ingestion.chunk_size,
    )
    .await?;

    Ok(Json(report))
}

/// Processed reviews with optional `category` / `theme` filters
pub async fn list_processed(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<ProcessedFilter>,
) -> Result<Json<ProcessedList>> {
    auth.require(Capability::ReadReviews)?;

    let reviews = state
        .repo
        .list_processed_with_owner(&filter)
        .await?
        .into_iter()
        .map(|(review, owner)| ProcessedReviewView::new(review, owner))
        .collect();

    Ok(Json(ProcessedList { reviews }))
}

/// Create processed rows for every review lacking one
pub async fn copy_all(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>> {
    auth.require(Capability::AnalyzeReviews)?;

    let copied = state.annotator.copy_all().await?;

    Ok(Json(serde_json::json!({
        "message": format!("Copied {} reviews to processed", copied),
        "copied": copied,
    })))
}

/// Partial update; explicit nulls clear a field
pub async fn update_analysis_fields(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<UpdateFieldsRequest>,
) -> Result<Json<UpdateResponse>> {
    auth.require(Capability::EditAnalysis)?;

    let review = state.annotator.update_fields(request.id, request.patch).await?;

    Ok(Json(UpdateResponse {
        success: true,
        review: review.into(),
    }))
}

pub async fn update_theme(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<UpdateThemeRequest>,
) -> Result<Json<UpdateResponse>> {
    auth.require(Capability::EditAnalysis)?;

    let review = state.annotator.update_theme(request.id, request.theme).await?;

    Ok(Json(UpdateResponse {
        success: true,
        review: review.into(),
    }))
}

pub async fn reset_analysis(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<ResetRequest>,
) -> Result<Json<UpdateResponse>> {
    auth.require(Capability::EditAnalysis)?;

    let review = state.annotator.reset(request.id).await?;

    Ok(Json(UpdateResponse {
        success: true,
        review: review.into(),
    }))
}

pub async fn reset_all_analysis(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>> {
    auth.require(Capability::EditAnalysis)?;

    let reset = state.annotator.reset_all().await?;

    Ok(Json(serde_json::json!({ "success": true, "reset": reset })))
}

/// All-or-nothing edit of processed reviews and their source reviews
pub async fn bulk_update_processed(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<BulkEditRequest>,
) -> Result<Json<Value>> {
    auth.require(Capability::EditAnalysis)?;

    let updated = state.annotator.bulk_edit(request.reviews).await?;

    Ok(Json(serde_json::json!({ "success": true, "updated": updated })))
}
