//! Registration, login and identity handlers
//!
//! Users are identified by the exact (full name, organization) pair; there
//! is no password. New users always start with the worker role.

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use sentai_common::{
    auth::{AuthUser, Role},
    db::models::User,
    errors::{AppError, Result},
    extract::Json,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRequest {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,

    #[validate(length(min = 1, max = 255))]
    pub organization: String,
}

impl IdentityRequest {
    /// Trimmed identity, rejecting blank parts
    fn normalized(self) -> Result<(String, String)> {
        self.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: None,
        })?;

        let full_name = self.full_name.trim().to_string();
        let organization = self.organization.trim().to_string();
        if full_name.is_empty() {
            return Err(AppError::validation("fullName", "Full name must not be blank"));
        }
        if organization.is_empty() {
            return Err(AppError::validation("organization", "Organization must not be blank"));
        }
        Ok((full_name, organization))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i32,
    pub full_name: String,
    pub organization: String,
    pub role: Role,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            organization: user.organization,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: UserView,
}

fn issue(state: &AppState, user: User) -> Result<TokenResponse> {
    let token = state
        .jwt
        .generate_token(user.id, &user.full_name, &user.organization, user.role)?;
    Ok(TokenResponse {
        token,
        user: user.into(),
    })
}

/// Create a worker account and return its token
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<IdentityRequest>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    let (full_name, organization) = request.normalized()?;

    let user = state.repo.create_user(&full_name, &organization, Role::Worker).await?;

    tracing::info!(user_id = user.id, organization = %user.organization, "User registered");

    Ok((StatusCode::CREATED, Json(issue(&state, user)?)))
}

/// Exchange an existing identity for a token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<IdentityRequest>,
) -> Result<Json<TokenResponse>> {
    let (full_name, organization) = request.normalized()?;

    let user = state
        .repo
        .find_user_by_identity(&full_name, &organization)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(issue(&state, user)?))
}

/// The caller's stored profile
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<UserView>> {
    let user = state
        .repo
        .find_user_by_id(auth.id)
        .await?
        .ok_or(AppError::UserNotFound { id: auth.id })?;

    Ok(Json(user.into()))
}
