//! Authentication and authorization utilities
//!
//! Provides:
//! - Roles and the capability check used by every protected operation
//! - JWT token generation and validation
//! - The `AuthUser` extractor for handlers

use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Reads reviews and reports
    #[sea_orm(string_value = "worker")]
    Worker,
    /// Uploads, analyzes and edits reviews
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// Operations gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ReadReviews,
    ReadReports,
    GenerateRecommendations,
    IngestReviews,
    AnalyzeReviews,
    EditAnalysis,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ReadReviews => "read_reviews",
            Capability::ReadReports => "read_reports",
            Capability::GenerateRecommendations => "generate_recommendations",
            Capability::IngestReviews => "ingest_reviews",
            Capability::AnalyzeReviews => "analyze_reviews",
            Capability::EditAnalysis => "edit_analysis",
        }
    }
}

/// The single authorization predicate
pub fn has_capability(role: Role, capability: Capability) -> bool {
    match role {
        Role::Admin => true,
        Role::Worker => matches!(
            capability,
            Capability::ReadReviews | Capability::ReadReports | Capability::GenerateRecommendations
        ),
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtClaims {
    /// User ID
    pub id: i32,

    pub full_name: String,

    pub organization: String,

    pub role: Role,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new JWT token
    pub fn generate_token(
        &self,
        id: i32,
        full_name: &str,
        organization: &str,
        role: Role,
    ) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            id,
            full_name: full_name.to_string(),
            organization: organization.to_string(),
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }
}

/// Extract the token from an Authorization header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authenticated caller, available to handlers
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub full_name: String,
    pub organization: String,
    pub role: Role,
}

impl AuthUser {
    /// Require a capability, returning Forbidden if the role lacks it
    pub fn require(&self, capability: Capability) -> Result<()> {
        if has_capability(self.role, capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                message: format!("Role lacks capability: {}", capability.as_str()),
            })
        }
    }
}

impl From<JwtClaims> for AuthUser {
    fn from(claims: JwtClaims) -> Self {
        Self {
            id: claims.id,
            full_name: claims.full_name,
            organization: claims.organization,
            role: claims.role,
        }
    }
}

/// Axum extractor for AuthUser
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer(auth_header).ok_or_else(|| AppError::Unauthorized {
            message: "Authorization header must carry a bearer token".to_string(),
        })?;

        let jwt = Arc::<JwtManager>::from_ref(state);
        let claims = jwt.validate_token(token)?;

        Ok(AuthUser::from(claims))
    }
}
