//! Recommendation generate-or-fetch handlers, general and competitor variants

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::AppState;
use sentai_common::{
    auth::{AuthUser, Capability},
    db::{Recommendation, RecommendationKey, RecommendationKind},
    errors::Result,
    extract::{Json, Query},
};

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub category: String,
    #[serde(default)]
    pub theme: Option<String>,
    /// Regenerate even when a stored text exists
    #[serde(default = "default_refresh")]
    pub refresh: bool,
}

fn default_refresh() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub category: Option<String>,
    pub theme: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommendation: Recommendation,
    pub cached: bool,
}

#[derive(Debug, Serialize)]
pub struct RecommendationList {
    pub recommendations: Vec<Recommendation>,
}

async fn generate(
    state: &AppState,
    auth: &AuthUser,
    kind: RecommendationKind,
    request: RecommendationRequest,
) -> Result<Json<RecommendationResponse>> {
    auth.require(Capability::GenerateRecommendations)?;

    let key = RecommendationKey::new(request.category, request.theme);
    let (recommendation, cached) = state
        .recommendations
        .get_or_generate(kind, key, request.refresh)
        .await?;

    Ok(Json(RecommendationResponse { recommendation, cached }))
}

async fn list(
    state: &AppState,
    auth: &AuthUser,
    kind: RecommendationKind,
    query: RecommendationQuery,
) -> Result<Json<RecommendationList>> {
    auth.require(Capability::ReadReports)?;

    let recommendations = state
        .recommendations
        .list(kind, query.category.as_deref(), query.theme.as_deref())
        .await?;

    Ok(Json(RecommendationList { recommendations }))
}

pub async fn ai_recommendation(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>> {
    generate(&state, &auth, RecommendationKind::General, request).await
}

pub async fn ai_recommendations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<RecommendationList>> {
    list(&state, &auth, RecommendationKind::General, query).await
}

pub async fn competitor_recommendation(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>> {
    generate(&state, &auth, RecommendationKind::Competitor, request).await
}

pub async fn competitor_recommendations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<RecommendationList>> {
    list(&state, &auth, RecommendationKind::Competitor, query).await
}
