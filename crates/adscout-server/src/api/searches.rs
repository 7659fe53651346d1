//! Search intake and retrieval endpoints.
//!
//! Submission validates the criteria, checks the plan quota, persists the
//! search in `processing`, charges the quota, and hands the heavy work to a
//! detached matching task. The response returns immediately with the
//! `processing` row; clients poll the results endpoint.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adscout_core::SearchCriteria;
use adscout_db::{NewSearch, SearchResultDetailRow, SearchRow};

use super::{map_db_error, normalize_limit, normalize_page, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::{CurrentAccount, RequestId};

#[derive(Debug, Deserialize)]
pub(super) struct CreateSearchRequest {
    budget: f64,
    #[serde(default)]
    target_audience: Option<serde_json::Value>,
    #[serde(default)]
    industries: Vec<String>,
    #[serde(default)]
    ad_types: Vec<String>,
    #[serde(default)]
    platform_slugs: Vec<String>,
    #[serde(default)]
    goals: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SearchItem {
    pub id: Uuid,
    pub budget: Decimal,
    pub target_audience: Option<serde_json::Value>,
    pub industries: Vec<String>,
    pub ad_types: Vec<String>,
    pub platform_slugs: Vec<String>,
    pub goals: Vec<String>,
    pub status: String,
    pub result_count: i32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<SearchRow> for SearchItem {
    fn from(row: SearchRow) -> Self {
        Self {
            id: row.public_id,
            budget: row.budget,
            target_audience: row.target_audience,
            industries: row.industries,
            ad_types: row.ad_types,
            platform_slugs: row.platform_slugs,
            goals: row.goals,
            status: row.status,
            result_count: row.result_count,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SearchResultItem {
    pub rank: i32,
    pub match_score: i32,
    pub recommended_budget: Decimal,
    pub expected_reach: i64,
    pub expected_ctr: Decimal,
    pub expected_roi: Decimal,
    pub reasoning: String,
    pub opportunity_id: Uuid,
    pub opportunity_title: String,
    pub platform_name: String,
    pub platform_slug: String,
    pub ad_type: String,
}

impl From<SearchResultDetailRow> for SearchResultItem {
    fn from(row: SearchResultDetailRow) -> Self {
        Self {
            rank: row.rank,
            match_score: row.match_score,
            recommended_budget: row.recommended_budget.unwrap_or_default(),
            expected_reach: row.expected_reach.unwrap_or_default(),
            expected_ctr: row.expected_ctr.unwrap_or_default(),
            expected_roi: row.expected_roi.unwrap_or_default(),
            reasoning: row.reasoning.unwrap_or_default(),
            opportunity_id: row.opportunity_public_id,
            opportunity_title: row.opportunity_title,
            platform_name: row.platform_name,
            platform_slug: row.platform_slug,
            ad_type: row.ad_type,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SearchResultsData {
    pub status: String,
    pub results: Vec<SearchResultItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchListQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

pub(super) async fn create_search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(account): Extension<CurrentAccount>,
    Json(payload): Json<CreateSearchRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SearchItem>>), ApiError> {
    let criteria = SearchCriteria {
        budget: payload.budget,
        target_audience: payload.target_audience,
        industries: payload.industries,
        ad_types: payload.ad_types,
        platform_slugs: payload.platform_slugs,
        goals: payload.goals,
    };
    if let Err(e) = criteria.validate() {
        return Err(ApiError::new(req_id.0, "validation_error", e.to_string()));
    }

    if !account.plan.allows_search(account.searches_used) {
        return Err(ApiError::new(
            req_id.0,
            "quota_exceeded",
            "monthly search limit reached for this plan",
        ));
    }

    let budget = Decimal::from_f64_retain(criteria.budget)
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "validation_error",
                "budget is not representable",
            )
        })?
        .round_dp(2);

    let new_search = NewSearch {
        account_id: account.id,
        budget,
        target_audience: criteria.target_audience.clone(),
        industries: criteria.industries.clone(),
        ad_types: criteria.ad_types.clone(),
        platform_slugs: criteria.platform_slugs.clone(),
        goals: criteria.goals.clone(),
    };

    let row = adscout_db::create_search(&state.pool, &new_search)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    // Charge on submission; failed searches still count against the quota.
    adscout_db::increment_searches_used(&state.pool, account.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(search_id = row.id, account_id = account.id, "search accepted");
    drop(crate::matcher::spawn_process_search(state.pool.clone(), row.id));

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: SearchItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn list_searches(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(account): Extension<CurrentAccount>,
    Query(query): Query<SearchListQuery>,
) -> Result<Json<ApiResponse<Vec<SearchItem>>>, ApiError> {
    let limit = normalize_limit(query.limit);
    let page = normalize_page(query.page);
    let offset = (page - 1) * limit;

    let (rows, total) =
        adscout_db::list_searches_for_account(&state.pool, account.id, limit, offset)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(SearchItem::from).collect(),
        meta: ResponseMeta::paginated(req_id.0, page, limit, total),
    }))
}

pub(super) async fn get_search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(account): Extension<CurrentAccount>,
    Path(search_id): Path<String>,
) -> Result<Json<ApiResponse<SearchItem>>, ApiError> {
    let public_id = parse_search_id(&req_id.0, &search_id)?;

    let row = adscout_db::get_search_for_account(&state.pool, public_id, account.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: SearchItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_search_results(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(account): Extension<CurrentAccount>,
    Path(search_id): Path<String>,
) -> Result<Json<ApiResponse<SearchResultsData>>, ApiError> {
    let public_id = parse_search_id(&req_id.0, &search_id)?;

    let search = adscout_db::get_search_for_account(&state.pool, public_id, account.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let results = adscout_db::list_results_for_search(&state.pool, search.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: SearchResultsData {
            status: search.status,
            results: results.into_iter().map(SearchResultItem::from).collect(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn parse_search_id(request_id: &str, raw: &str) -> Result<Uuid, ApiError> {
    raw.parse::<Uuid>().map_err(|_| {
        ApiError::new(
            request_id.to_string(),
            "validation_error",
            "search id must be a UUID",
        )
    })
}
