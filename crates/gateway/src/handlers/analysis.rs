//! Per-dimension analysis handlers
//!
//! Each endpoint makes exactly one analyzer call. With an `id` the value is
//! written to that processed review; with only `text` it is returned as a
//! preview and nothing is stored.

use axum::extract::State;
use serde_json::{json, Value};

use crate::AppState;
use sentai_common::{
    auth::{AuthUser, Capability},
    errors::Result,
    extract::Json,
    pipeline::{AnalysisTarget, AnalyzeAllReport},
    vocabulary::Dimension,
};

async fn analyze(state: &AppState, auth: &AuthUser, dimension: Dimension, target: AnalysisTarget) -> Result<Json<Value>> {
    auth.require(Capability::AnalyzeReviews)?;

    let outcome = state.annotator.analyze_one(target, dimension).await?;

    let mut body = json!({ "id": outcome.id });
    body[dimension.as_str()] = serde_json::to_value(&outcome.value)?;
    Ok(Json(body))
}

pub async fn analyze_theme(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(target): Json<AnalysisTarget>,
) -> Result<Json<Value>> {
    analyze(&state, &auth, Dimension::Theme, target).await
}

pub async fn analyze_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(target): Json<AnalysisTarget>,
) -> Result<Json<Value>> {
    analyze(&state, &auth, Dimension::Category, target).await
}

pub async fn analyze_tags(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(target): Json<AnalysisTarget>,
) -> Result<Json<Value>> {
    analyze(&state, &auth, Dimension::Tags, target).await
}

pub async fn analyze_sentiment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(target): Json<AnalysisTarget>,
) -> Result<Json<Value>> {
    analyze(&state, &auth, Dimension::Sentiment, target).await
}

pub async fn analyze_priority(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(target): Json<AnalysisTarget>,
) -> Result<Json<Value>> {
    analyze(&state, &auth, Dimension::Priority, target).await
}

pub async fn analyze_competitor(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(target): Json<AnalysisTarget>,
) -> Result<Json<Value>> {
    analyze(&state, &auth, Dimension::CompetitorMention, target).await
}

/// Copy, then fill every unset dimension of every processed review
pub async fn analyze_all(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>> {
    auth.require(Capability::AnalyzeReviews)?;

    let report: AnalyzeAllReport = state.annotator.analyze_all().await?;

    let mut body = serde_json::to_value(&report)?;
    body["message"] = json!(format!(
        "Analyzed {} reviews, {} values written, {} failures",
        report.visited,
        report.written,
        report.failures.len()
    ));
    Ok(Json(body))
}
