//! Dashboard aggregation handlers

use axum::extract::State;
use serde::Deserialize;

use crate::AppState;
use sentai_common::{
    auth::{AuthUser, Capability},
    errors::Result,
    extract::{Json, Query},
    pipeline::{report, Stats, TopCategory},
};

#[derive(Debug, Default, Deserialize)]
pub struct TopCategoriesQuery {
    pub limit: Option<usize>,
}

pub async fn stats(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Stats>> {
    auth.require(Capability::ReadReports)?;
    Ok(Json(report::stats(&state.repo).await?))
}

/// (category, priority) groups by descending count
pub async fn top_categories(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TopCategoriesQuery>,
) -> Result<Json<Vec<TopCategory>>> {
    auth.require(Capability::ReadReports)?;
    Ok(Json(report::top_categories(&state.repo, query.limit).await?))
}
