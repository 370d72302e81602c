//! Request extractors that reject with the standard error envelope
//!
//! Axum's own `Json` and `Query` reject malformed input with a plain-text
//! body. These wrappers run the same extraction but turn the rejection into
//! an [`AppError`], so clients always receive `{"error": {...}}`.

use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};

use crate::errors::AppError;

/// JSON body extractor and response
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
    axum::Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string extractor
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Target {
        id: i32,
    }

    #[derive(Debug, Deserialize)]
    struct Paging {
        limit: usize,
    }

    fn json_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_json_accepts_valid_body() {
        let Json(target) = Json::<Target>::from_request(json_request(r#"{"id": 4}"#), &())
            .await
            .unwrap();
        assert_eq!(target.id, 4);
    }

    #[tokio::test]
    async fn test_json_rejection_is_validation_error() {
        let err = Json::<Target>::from_request(json_request("{}"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = Json::<Target>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_json_without_content_type_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"id": 4}"#))
            .unwrap();
        let err = Json::<Target>::from_request(request, &()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_query_rejection_is_validation_error() {
        let request = Request::builder()
            .uri("/?limit=many")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let err = Query::<Paging>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let request = Request::builder().uri("/?limit=3").body(Body::empty()).unwrap();
        let (mut parts, _) = request.into_parts();
        let Query(paging) = Query::<Paging>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(paging.limit, 3);
    }
}
