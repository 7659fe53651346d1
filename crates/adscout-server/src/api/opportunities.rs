//! Opportunity browsing endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adscout_db::{OpportunityListFilters, OpportunityListItem};

use super::{
    map_db_error, normalize_limit, normalize_page, ApiError, ApiResponse, AppState, ResponseMeta,
};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct OpportunityItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub ad_type: String,
    pub placement: Option<String>,
    pub pricing_model: String,
    pub min_budget: Option<Decimal>,
    pub max_budget: Option<Decimal>,
    pub cpm_estimate: Option<Decimal>,
    pub avg_ctr: Option<Decimal>,
    pub avg_conversion: Option<Decimal>,
    pub quality_score: i32,
    pub platform_name: String,
    pub platform_slug: String,
    pub platform_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<OpportunityListItem> for OpportunityItem {
    fn from(row: OpportunityListItem) -> Self {
        Self {
            id: row.public_id,
            title: row.title,
            description: row.description,
            ad_type: row.ad_type,
            placement: row.placement,
            pricing_model: row.pricing_model,
            min_budget: row.min_budget,
            max_budget: row.max_budget,
            cpm_estimate: row.cpm_estimate,
            avg_ctr: row.avg_ctr,
            avg_conversion: row.avg_conversion,
            quality_score: row.quality_score,
            platform_name: row.platform_name,
            platform_slug: row.platform_slug,
            platform_type: row.platform_type,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct OpportunityListQuery {
    platform: Option<String>,
    platform_type: Option<String>,
    ad_type: Option<String>,
    pricing_model: Option<String>,
    min_budget: Option<Decimal>,
    max_budget: Option<Decimal>,
    min_ctr: Option<Decimal>,
    search: Option<String>,
    sort_by: Option<String>,
    sort_order: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

pub(super) async fn list_opportunities(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<OpportunityListQuery>,
) -> Result<Json<ApiResponse<Vec<OpportunityItem>>>, ApiError> {
    let limit = normalize_limit(query.limit);
    let page = normalize_page(query.page);

    let filters = OpportunityListFilters {
        platform_slug: query.platform.as_deref(),
        platform_type: query.platform_type.as_deref(),
        ad_type: query.ad_type.as_deref(),
        pricing_model: query.pricing_model.as_deref(),
        min_budget: query.min_budget,
        max_budget: query.max_budget,
        min_ctr: query.min_ctr,
        search: query.search.as_deref(),
        sort_by: query.sort_by.as_deref(),
        // quality_score sorts best-first by default; "asc" flips it.
        sort_descending: !matches!(query.sort_order.as_deref(), Some("asc")),
        limit,
        offset: (page - 1) * limit,
    };

    let rows = adscout_db::list_opportunities(&state.pool, &filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let total = adscout_db::count_opportunities(&state.pool, &filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(OpportunityItem::from).collect(),
        meta: ResponseMeta::paginated(req_id.0, page, limit, total),
    }))
}

pub(super) async fn get_opportunity(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(opportunity_id): Path<String>,
) -> Result<Json<ApiResponse<OpportunityItem>>, ApiError> {
    let public_id: Uuid = opportunity_id.parse().map_err(|_| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            "opportunity id must be a UUID",
        )
    })?;

    let row = adscout_db::get_opportunity_by_public_id(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: OpportunityItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}
