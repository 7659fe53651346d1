mod opportunities;
mod platforms;
mod recommendations;
mod searches;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_api_key, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
            pagination: None,
        }
    }

    pub(super) fn paginated(request_id: String, page: i64, limit: i64, total: i64) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
            pagination: Some(Pagination { page, limit, total }),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "quota_exceeded" | "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(20).clamp(1, 50)
}

pub(super) fn normalize_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

pub(super) fn map_db_error(request_id: String, error: &adscout_db::DbError) -> ApiError {
    match error {
        adscout_db::DbError::NotFound => {
            ApiError::new(request_id, "not_found", "resource not found")
        }
        adscout_db::DbError::Sqlx(sqlx::Error::Database(db))
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
        {
            ApiError::new(request_id, "conflict", "resource already exists")
        }
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/searches",
            get(searches::list_searches).post(searches::create_search),
        )
        .route("/api/v1/searches/{search_id}", get(searches::get_search))
        .route(
            "/api/v1/searches/{search_id}/results",
            get(searches::list_search_results),
        )
        .route(
            "/api/v1/opportunities",
            get(opportunities::list_opportunities),
        )
        .route(
            "/api/v1/opportunities/{opportunity_id}",
            get(opportunities::get_opportunity),
        )
        .route("/api/v1/platforms", get(platforms::list_platforms))
        .route(
            "/api/v1/recommendations",
            get(recommendations::list_recommendations),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(auth, require_api_key)),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match adscout_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::searches::{SearchItem, SearchResultItem};
    use super::*;
    use adscout_core::hash_api_key;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tower::ServiceExt;
    use uuid::Uuid;

    const TEST_SALT: &str = "test-salt";
    const TEST_KEY: &str = "as_test_key_1";

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 20);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 50);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn normalize_page_floors_at_one() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some(-3)), 1);
        assert_eq!(normalize_page(Some(4)), 4);
    }

    #[test]
    fn api_error_quota_exceeded_maps_to_429() {
        let response =
            ApiError::new("req-1", "quota_exceeded", "monthly limit reached").into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn search_item_is_serializable() {
        let item = SearchItem {
            id: Uuid::new_v4(),
            budget: Decimal::new(500_000, 2), // 5000.00
            target_audience: None,
            industries: vec!["saas".to_string()],
            ad_types: vec![],
            platform_slugs: vec![],
            goals: vec!["clicks".to_string()],
            status: "processing".to_string(),
            result_count: 0,
            created_at: Utc::now(),
            completed_at: None,
        };
        let json = serde_json::to_string(&item).expect("serialize");
        assert!(json.contains("\"status\":\"processing\""));
        assert!(json.contains("\"budget\":\"5000.00\""));
    }

    #[test]
    fn search_result_item_is_serializable() {
        let item = SearchResultItem {
            rank: 1,
            match_score: 87,
            recommended_budget: Decimal::new(100_000, 2),
            expected_reach: 125_000,
            expected_ctr: Decimal::new(3, 2),
            expected_roi: Decimal::new(6, 2),
            reasoning: "High quality score.".to_string(),
            opportunity_id: Uuid::new_v4(),
            opportunity_title: "Sponsored newsletter slot".to_string(),
            platform_name: "Paved".to_string(),
            platform_slug: "paved".to_string(),
            ad_type: "newsletter".to_string(),
        };
        let json = serde_json::to_string(&item).expect("serialize");
        assert!(json.contains("\"rank\":1"));
        assert!(json.contains("\"platform_slug\":\"paved\""));
    }

    async fn seed_account(pool: &sqlx::PgPool, plan: &str, searches_used: i32) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO accounts (name, api_key_hash, plan, searches_used) \
             VALUES ('Test Account', $1, $2, $3) RETURNING id",
        )
        .bind(hash_api_key(TEST_SALT, TEST_KEY))
        .bind(plan)
        .bind(searches_used)
        .fetch_one(pool)
        .await
        .expect("seed account")
    }

    fn test_app(pool: sqlx::PgPool) -> Router {
        let auth = AuthState::new(pool.clone(), TEST_SALT);
        build_app(AppState { pool }, auth, default_rate_limit_state())
    }

    fn authed_get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {TEST_KEY}"))
            .body(Body::empty())
            .expect("request")
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_is_public(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["status"].as_str(), Some("ok"));
        assert!(json["meta"]["request_id"].is_string());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn protected_routes_reject_missing_key(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/searches")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn protected_routes_reject_wrong_key(pool: sqlx::PgPool) {
        seed_account(&pool, "starter", 0).await;

        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/searches")
                    .header("authorization", "Bearer wrong-key")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_searches_returns_empty_page_for_fresh_account(pool: sqlx::PgPool) {
        seed_account(&pool, "starter", 0).await;

        let app = test_app(pool);
        let response = app
            .oneshot(authed_get("/api/v1/searches"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"].as_array().map(Vec::len), Some(0));
        assert_eq!(json["meta"]["pagination"]["total"].as_i64(), Some(0));
        assert_eq!(json["meta"]["pagination"]["page"].as_i64(), Some(1));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_search_rejects_non_positive_budget(pool: sqlx::PgPool) {
        seed_account(&pool, "starter", 0).await;

        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/searches")
                    .header("authorization", format!("Bearer {TEST_KEY}"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"budget": 0}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_search_enforces_plan_quota(pool: sqlx::PgPool) {
        // Starter plan allows 50 searches per month.
        seed_account(&pool, "starter", 50).await;

        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/searches")
                    .header("authorization", format!("Bearer {TEST_KEY}"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"budget": 5000}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["error"]["code"].as_str(), Some("quota_exceeded"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_search_returns_accepted_search(pool: sqlx::PgPool) {
        let account_id = seed_account(&pool, "growth", 0).await;

        let app = test_app(pool.clone());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/searches")
                    .header("authorization", format!("Bearer {TEST_KEY}"))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"budget": 5000, "goals": ["clicks"], "industries": ["saas"]}"#,
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["status"].as_str(), Some("processing"));
        assert!(json["data"]["id"].is_string());

        // Submission charges the quota regardless of the outcome.
        let used: i32 =
            sqlx::query_scalar("SELECT searches_used FROM accounts WHERE id = $1")
                .bind(account_id)
                .fetch_one(&pool)
                .await
                .expect("query usage");
        assert_eq!(used, 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn get_search_returns_404_for_unknown_id(pool: sqlx::PgPool) {
        seed_account(&pool, "starter", 0).await;

        let app = test_app(pool);
        let response = app
            .oneshot(authed_get(&format!("/api/v1/searches/{}", Uuid::new_v4())))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn platforms_lists_seeded_platforms(pool: sqlx::PgPool) {
        seed_account(&pool, "starter", 0).await;
        adscout_db::seed::seed_demo_data(&pool, None)
            .await
            .expect("seed demo data");

        let app = test_app(pool);
        let response = app
            .oneshot(authed_get("/api/v1/platforms"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = json["data"].as_array().expect("data array");
        assert!(!data.is_empty());
        assert!(data
            .iter()
            .any(|p| p["slug"].as_str() == Some("facebook-ads")));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn opportunities_list_filters_by_platform(pool: sqlx::PgPool) {
        seed_account(&pool, "starter", 0).await;
        adscout_db::seed::seed_demo_data(&pool, None)
            .await
            .expect("seed demo data");

        let app = test_app(pool);
        let response = app
            .oneshot(authed_get("/api/v1/opportunities?platform=facebook-ads"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = json["data"].as_array().expect("data array");
        assert!(!data.is_empty());
        assert!(data
            .iter()
            .all(|o| o["platform_slug"].as_str() == Some("facebook-ads")));
    }
}
