//! SentAI API Gateway
//!
//! The HTTP entry point for the review pipeline, mounted under `/api`.
//! Handles:
//! - Registration, login and bearer authentication
//! - Review ingestion, listing and analysis-field edits
//! - Per-dimension analysis and the full analysis pass
//! - Stats, top categories and recommendations
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use sentai_common::{
    analyzer::{create_analyzer, Analyzer},
    auth::JwtManager,
    config::AppConfig,
    db::{DbPool, Repository},
    logging,
    metrics::{self, ANALYSIS_BUCKETS, LATENCY_BUCKETS},
    pipeline::{Annotator, RecommendationService},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::middleware::rate_limit::{rate_limit_middleware, RateLimit};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub jwt: Arc<JwtManager>,
    pub annotator: Annotator,
    pub recommendations: RecommendationService,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, pool: DbPool, analyzer: Arc<dyn Analyzer>, jwt: JwtManager) -> Self {
        let repo = Repository::new(pool);
        Self {
            annotator: Annotator::new(repo.clone(), analyzer.clone()),
            recommendations: RecommendationService::new(repo.clone(), analyzer),
            jwt: Arc::new(jwt),
            repo,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init(&config.observability);

    info!("Starting SentAI API Gateway v{}", sentai_common::VERSION);

    if config.observability.metrics_port != 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    let jwt = JwtManager::new(config.jwt_secret()?, config.auth.jwt_expiration_secs);
    let analyzer = create_analyzer(&config.analyzer)?;

    info!("Connecting to database...");
    let pool = DbPool::new(&config.database).await?;
    pool.init_schema().await?;

    let config = Arc::new(config);
    let state = AppState::new(config.clone(), pool, analyzer, jwt);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Prometheus scrape endpoint on its own port
fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("request_duration_seconds".to_string()), LATENCY_BUCKETS)?
        .set_buckets_for_metric(Matcher::Suffix("analysis_duration_seconds".to_string()), ANALYSIS_BUCKETS)?
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!(port, "Metrics exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    use handlers::{analysis, auth, health, recommendations, reports, reviews};

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Auth endpoints
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))

        // Raw reviews
        .route("/reviews", get(reviews::list_reviews))
        .route("/reviews/bulk", post(reviews::bulk_upload))

        // Processed reviews
        .route("/reviews/processed", get(reviews::list_processed))
        .route("/reviews/processed/bulk-update", post(reviews::bulk_update_processed))
        .route("/reviews/copy-all-to-processed", post(reviews::copy_all))
        .route("/reviews/update-analysis-fields", post(reviews::update_analysis_fields))
        .route("/reviews/update-theme", post(reviews::update_theme))
        .route("/reviews/reset-analysis", post(reviews::reset_analysis))
        .route("/reviews/reset-all-analysis", post(reviews::reset_all_analysis))

        // Analysis
        .route("/reviews/analyze-theme", post(analysis::analyze_theme))
        .route("/reviews/analyze-category", post(analysis::analyze_category))
        .route("/reviews/analyze-tags", post(analysis::analyze_tags))
        .route("/reviews/analyze-sentiment", post(analysis::analyze_sentiment))
        .route("/reviews/analyze-priority", post(analysis::analyze_priority))
        .route("/reviews/analyze-competitor", post(analysis::analyze_competitor))
        .route("/reviews/analyze-all", post(analysis::analyze_all))

        // Reports
        .route("/reviews/stats", get(reports::stats))
        .route("/reviews/top-categories", get(reports::top_categories))

        // Recommendations
        .route("/reviews/ai-recommendation", post(recommendations::ai_recommendation))
        .route("/reviews/ai-recommendations", get(recommendations::ai_recommendations))
        .route("/reviews/competitor-recommendation", post(recommendations::competitor_recommendation))
        .route("/reviews/competitor-recommendations", get(recommendations::competitor_recommendations))
        .route_layer(axum::middleware::from_fn(middleware::track_metrics));

    let mut app = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(state.config.server.body_limit_bytes))
        .layer(ConcurrencyLimitLayer::new(state.config.server.max_concurrent_requests));

    if state.config.rate_limit.enabled {
        let limit = RateLimit::new(&state.config.rate_limit);
        app = app.layer(axum::middleware::from_fn_with_state(limit, rate_limit_middleware));
    }

    app.layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use sentai_common::{analyzer::MockAnalyzer, auth::Role};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    async fn test_app() -> (Router, AppState) {
        let pool = DbPool::in_memory().await.unwrap();
        let state = AppState::new(
            Arc::new(AppConfig::default()),
            pool,
            Arc::new(MockAnalyzer::new()),
            JwtManager::new(SECRET, 3600),
        );
        (create_router(state.clone()), state)
    }

    async fn admin_token(state: &AppState) -> String {
        let admin = state.repo.create_user("Olga Admin", "Acme", Role::Admin).await.unwrap();
        tokio_test::assert_ok!(state.jwt.generate_token(
            admin.id,
            &admin.full_name,
            &admin.organization,
            admin.role
        ))
    }

    async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let (app, _) = test_app().await;

        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["database"]["status"], "up");
    }

    #[tokio::test]
    async fn test_register_login_me() {
        let (app, _) = test_app().await;
        let identity = json!({ "fullName": "Ivan Petrov", "organization": "Acme" });

        let (status, body) = send(&app, Method::POST, "/api/auth/register", None, Some(identity.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["role"], "worker");

        let (status, _) = send(&app, Method::POST, "/api/auth/register", None, Some(identity.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, Method::POST, "/api/auth/login", None, Some(identity)).await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fullName"], "Ivan Petrov");

        let unknown = json!({ "fullName": "Nobody", "organization": "Acme" });
        let (status, body) = send(&app, Method::POST, "/api/auth/login", None, Some(unknown)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_missing_and_invalid_tokens() {
        let (app, _) = test_app().await;

        let (status, body) = send(&app, Method::GET, "/api/reviews/stats", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, body) = send(&app, Method::GET, "/api/reviews/stats", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_worker_is_forbidden_from_ingestion() {
        let (app, _) = test_app().await;
        let identity = json!({ "fullName": "Ivan Petrov", "organization": "Acme" });
        let (_, body) = send(&app, Method::POST, "/api/auth/register", None, Some(identity)).await;
        let token = body["token"].as_str().unwrap().to_string();

        let upload = json!({ "reviews": [{ "text": "Fine", "rating": 4 }] });
        let (status, body) = send(&app, Method::POST, "/api/reviews/bulk", Some(&token), Some(upload)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        let (status, _) = send(&app, Method::GET, "/api/reviews/stats", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ingest_copy_analyze_and_report() {
        let (app, state) = test_app().await;
        let token = admin_token(&state).await;

        let upload = json!({ "reviews": [
            { "text": "Great service", "rating": 5 },
            { "text": "", "rating": 3 },
            { "text": "Slow support", "rating": 2 },
        ]});
        let (status, body) = send(&app, Method::POST, "/api/reviews/bulk", Some(&token), Some(upload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": 2, "total": 3, "errors": ["row 2: empty text"] }));

        let (_, body) = send(&app, Method::GET, "/api/reviews", Some(&token), None).await;
        assert_eq!(body["reviews"].as_array().unwrap().len(), 2);
        assert_eq!(body["reviews"][0]["user"]["fullName"], "Olga Admin");

        let (_, body) = send(&app, Method::POST, "/api/reviews/copy-all-to-processed", Some(&token), None).await;
        assert_eq!(body["copied"], 2);
        let (_, body) = send(&app, Method::POST, "/api/reviews/copy-all-to-processed", Some(&token), None).await;
        assert_eq!(body["copied"], 0);

        let (_, body) = send(&app, Method::GET, "/api/reviews/processed", Some(&token), None).await;
        let first_id = body["reviews"][0]["id"].as_i64().unwrap();
        assert_eq!(body["reviews"][0]["tags"], json!([]));

        let target = json!({ "id": first_id });
        let (status, body) = send(&app, Method::POST, "/api/reviews/analyze-sentiment", Some(&token), Some(target)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["sentiment"].is_string());

        let (status, body) = send(&app, Method::POST, "/api/reviews/analyze-all", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["visited"], 2);
        assert_eq!(body["failures"], json!([]));

        let (_, stats) = send(&app, Method::GET, "/api/reviews/stats", Some(&token), None).await;
        assert_eq!(stats["totalReviews"], 2);

        let (_, top) = send(&app, Method::GET, "/api/reviews/top-categories", Some(&token), None).await;
        let sum: u64 = top.as_array().unwrap().iter().map(|g| g["count"].as_u64().unwrap()).sum();
        assert_eq!(sum, 2);

        let (status, _) = send(&app, Method::POST, "/api/reviews/reset-all-analysis", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, stats) = send(&app, Method::GET, "/api/reviews/stats", Some(&token), None).await;
        assert_eq!(
            stats,
            json!({ "totalReviews": 2, "negativeReviews": 0, "criticalReviews": 0, "competitorMentions": 0 })
        );
    }

    #[tokio::test]
    async fn test_update_fields_and_text_preview() {
        let (app, state) = test_app().await;
        let token = admin_token(&state).await;

        let upload = json!({ "reviews": [{ "text": "Hidden fees everywhere", "rating": 1 }] });
        send(&app, Method::POST, "/api/reviews/bulk", Some(&token), Some(upload)).await;
        send(&app, Method::POST, "/api/reviews/copy-all-to-processed", Some(&token), None).await;
        let (_, body) = send(&app, Method::GET, "/api/reviews/processed", Some(&token), None).await;
        let id = body["reviews"][0]["id"].as_i64().unwrap();

        let patch = json!({ "id": id, "sentiment": "Негативный", "priority": "very_important", "tags": ["price", "fees"] });
        let (status, body) = send(&app, Method::POST, "/api/reviews/update-analysis-fields", Some(&token), Some(patch)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["review"]["sentiment"], "negative");
        assert_eq!(body["review"]["tags"], json!(["price", "fees"]));

        let clear = json!({ "id": id, "priority": null });
        let (_, body) = send(&app, Method::POST, "/api/reviews/update-analysis-fields", Some(&token), Some(clear)).await;
        assert_eq!(body["review"]["priority"], Value::Null);
        assert_eq!(body["review"]["sentiment"], "negative");

        let bad = json!({ "id": id, "sentiment": "furious" });
        let (status, body) = send(&app, Method::POST, "/api/reviews/update-analysis-fields", Some(&token), Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let preview = json!({ "text": "Delivery was late" });
        let (status, body) = send(&app, Method::POST, "/api/reviews/analyze-theme", Some(&token), Some(preview)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], Value::Null);
        assert!(body["theme"].is_string());

        let missing = json!({ "id": 9999 });
        let (status, body) = send(&app, Method::POST, "/api/reviews/analyze-theme", Some(&token), Some(missing)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "PROCESSED_REVIEW_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_input_uses_error_envelope() {
        let (app, state) = test_app().await;
        let token = admin_token(&state).await;

        let cases = [
            ("/api/reviews/ai-recommendation", json!({})),
            ("/api/reviews/bulk", json!({})),
            ("/api/reviews/analyze-sentiment", json!({ "id": "seven" })),
            ("/api/auth/register", json!({ "fullName": "Ivan" })),
        ];
        for (uri, body) in cases {
            let (status, body) = send(&app, Method::POST, uri, Some(&token), Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "{}", uri);
        }

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/reviews/bulk")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"reviews\": ["))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = send(&app, Method::GET, "/api/reviews/top-categories?limit=many", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_recommendation_upserts_one_row() {
        let (app, state) = test_app().await;
        let token = admin_token(&state).await;
        let request = json!({ "category": "Pricing", "theme": "Hidden fees" });

        let (status, first) = send(&app, Method::POST, "/api/reviews/ai-recommendation", Some(&token), Some(request.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["cached"], false);

        let (_, second) = send(&app, Method::POST, "/api/reviews/ai-recommendation", Some(&token), Some(request)).await;
        assert_eq!(second["recommendation"]["id"], first["recommendation"]["id"]);

        let cached = json!({ "category": "Pricing", "theme": "Hidden fees", "refresh": false });
        let (_, third) = send(&app, Method::POST, "/api/reviews/ai-recommendation", Some(&token), Some(cached)).await;
        assert_eq!(third["cached"], true);

        let (_, list) = send(&app, Method::GET, "/api/reviews/ai-recommendations?category=Pricing", Some(&token), None).await;
        assert_eq!(list["recommendations"].as_array().unwrap().len(), 1);

        let (_, competitors) = send(&app, Method::GET, "/api/reviews/competitor-recommendations", Some(&token), None).await;
        assert_eq!(competitors["recommendations"], json!([]));
    }
}
